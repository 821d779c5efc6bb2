// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Endpoint type identifiers.
//!
//! An endpoint type is a signed 16-bit value. The full registry mapping values
//! to language-level type descriptors lives outside this crate; only the
//! handful of real types needed by wiring validation and random constant
//! generation are known here.
//!
//! | Range | Meaning |
//! |---|---|
//! | `-32768` | [`INVALID`] |
//! | `-32767` | [`UNKNOWN`] |
//! | `-32766..=-32369` | special (internal) types |
//! | `-32368..=-1` | physical types |
//! | `0..` | real types |

use rand::Rng;

/// Endpoint type identifier.
pub type EndPointType = i16;

/// Reserved: a type that can never be valid.
pub const INVALID: EndPointType = -32768;
/// Reserved: a type that has not been determined yet.
pub const UNKNOWN: EndPointType = -32767;
/// Upper (inclusive) bound of the special type range.
pub const SPECIAL_LIMIT: EndPointType = -32369;
/// Built-in boolean type.
pub const BOOL: EndPointType = 1;
/// Built-in integer type.
pub const INT: EndPointType = 2;
/// Built-in floating point type.
pub const FLOAT: EndPointType = 3;
/// Built-in string type.
pub const STR: EndPointType = 4;

const NAMES: [(EndPointType, &str); 4] = [
    (BOOL, "bool"),
    (INT, "int"),
    (FLOAT, "float"),
    (STR, "str"),
];

/// Coarse classification of an endpoint type value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    /// [`INVALID`] or [`UNKNOWN`].
    Sentinel,
    /// Internal type used by the engine itself.
    Special,
    /// Physical (side-effecting) type.
    Physical,
    /// Ordinary value type.
    Real,
}

/// Classify an endpoint type value.
pub const fn class_of(ty: EndPointType) -> TypeClass {
    if ty == INVALID || ty == UNKNOWN {
        TypeClass::Sentinel
    } else if ty <= SPECIAL_LIMIT {
        TypeClass::Special
    } else if ty < 0 {
        TypeClass::Physical
    } else {
        TypeClass::Real
    }
}

/// Returns `true` if `ty` may appear on a finished endpoint.
///
/// Special types are engine-internal and never valid on a genetic code
/// interface.
pub const fn is_valid(ty: EndPointType) -> bool {
    matches!(class_of(ty), TypeClass::Physical | TypeClass::Real)
}

/// Returns `true` if a source of type `src` may feed a destination of type `dst`.
pub const fn compatible(src: EndPointType, dst: EndPointType) -> bool {
    src == dst
}

/// Name of a built-in type, if known.
pub fn name_of(ty: EndPointType) -> Option<&'static str> {
    NAMES.iter().find(|(v, _)| *v == ty).map(|(_, n)| *n)
}

/// Look up a built-in type by name.
pub fn from_name(name: &str) -> Option<EndPointType> {
    NAMES.iter().find(|(_, n)| *n == name).map(|(v, _)| *v)
}

/// Check that `literal` is an acceptable constant expression for `ty`.
///
/// Built-in types get a literal syntax check. Any other valid type accepts a
/// non-empty literal because its evaluation belongs to the type registry.
pub fn validate_constant(literal: &str, ty: EndPointType) -> bool {
    let literal = literal.trim();
    match ty {
        BOOL => matches!(literal, "True" | "False"),
        INT => literal.parse::<i64>().is_ok(),
        FLOAT => literal.parse::<f64>().is_ok_and(f64::is_finite),
        STR => {
            literal.len() >= 2
                && ((literal.starts_with('"') && literal.ends_with('"'))
                    || (literal.starts_with('\'') && literal.ends_with('\'')))
        }
        _ => is_valid(ty) && !literal.is_empty(),
    }
}

/// Generate a random constant literal of type `ty`.
///
/// Returns `None` for types without a built-in literal form.
pub fn random_constant<R: Rng + ?Sized>(ty: EndPointType, rng: &mut R) -> Option<String> {
    match ty {
        BOOL => Some(if rng.gen_bool(0.5) { "True" } else { "False" }.to_owned()),
        INT => Some(rng.gen_range(-100_i64..=100).to_string()),
        FLOAT => Some(format!("{:?}", rng.gen_range(-100.0_f64..100.0))),
        STR => {
            let len = rng.gen_range(1..=10);
            let body: String = (0..len)
                .map(|_| {
                    let c = rng.gen_range(0..52_u8);
                    char::from(if c < 26 { b'a' + c } else { b'A' + (c - 26) })
                })
                .collect();
            Some(format!("\"{body}\""))
        }
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn sentinels_are_never_valid() {
        assert!(!is_valid(INVALID));
        assert!(!is_valid(UNKNOWN));
        assert!(!is_valid(SPECIAL_LIMIT));
        assert!(is_valid(SPECIAL_LIMIT + 1));
        assert!(is_valid(BOOL));
        assert_eq!(class_of(-5), TypeClass::Physical);
    }

    #[test]
    fn compatibility_is_exact_match() {
        assert!(compatible(INT, INT));
        assert!(!compatible(INT, BOOL));
    }

    #[test]
    fn names_round_trip() {
        for (v, n) in NAMES {
            assert_eq!(name_of(v), Some(n));
            assert_eq!(from_name(n), Some(v));
        }
        assert_eq!(name_of(999), None);
    }

    #[test]
    fn constant_literals() {
        assert!(validate_constant("True", BOOL));
        assert!(!validate_constant("true", BOOL));
        assert!(validate_constant("-75", INT));
        assert!(!validate_constant("4.5", INT));
        assert!(validate_constant("4.5", FLOAT));
        assert!(validate_constant("\"abc\"", STR));
        assert!(!validate_constant("abc", STR));
        assert!(!validate_constant("1", UNKNOWN));
    }

    #[test]
    fn random_constants_validate() {
        let mut rng = StdRng::seed_from_u64(7);
        for ty in [BOOL, INT, FLOAT, STR] {
            for _ in 0..50 {
                let lit = random_constant(ty, &mut rng).unwrap();
                assert!(validate_constant(&lit, ty), "{lit} is not a valid {ty}");
            }
        }
        assert!(random_constant(77, &mut rng).is_none());
    }
}
