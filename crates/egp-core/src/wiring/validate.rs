// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wiring validation.
//!
//! Every rule is checked and every violation reported; nothing fails fast.
//! Callers decide which codes are fatal, since an unconnected endpoint is the
//! normal state right after a structural edit.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::{EndpointKey, Wiring};
use crate::ep_type::{compatible, is_valid, validate_constant, BOOL};
use crate::row::{base_sources, EndPointClass, Row};

/// Category of a validation finding.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum FindingCode {
    /// Endpoint is not connected to anything.
    Unconnected,
    /// Endpoint type is not valid.
    InvalidType,
    /// Row indices are not contiguous from zero.
    NonContiguousRow,
    /// References into a row are not contiguous from zero.
    NonContiguousReferences,
    /// Constant literal does not parse for its type.
    InvalidConstant,
    /// Row F without row P, or row P without row F.
    FWithoutP,
    /// Row I or C holds a destination.
    MustBeSource,
    /// Row F, O, P or U holds a source.
    MustBeDestination,
    /// Source and destination types are incompatible.
    IncompatibleTypes,
    /// Destination fed from a row it may not read.
    DisallowedSourceRow,
    /// Row B reads row A while row F exists.
    BReadsAWithF,
    /// Row O reads row B while row F exists.
    OReadsBWithF,
    /// Row P and row O differ in length while row F exists.
    PLengthMismatch,
    /// A row U endpoint references more than one source.
    UReferencedTwice,
    /// A row U endpoint references a constant that does not exist.
    UMissingConstant,
    /// Row F exists but row I has no bool source.
    NoBoolInput,
    /// Source feeds a row it may not feed.
    DisallowedDestinationRow,
    /// Destination is fed by more than one source.
    MultipleSources,
    /// Reference with no matching back-reference.
    MissingBackReference,
    /// Row F holds other than exactly one endpoint.
    FLength,
    /// Row F endpoint is not bool.
    FNotBool,
    /// Row P endpoint type differs from the row O endpoint at the same index.
    PTypeMismatch,
}

impl FindingCode {
    /// Stable code string, e.g. `E01001`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unconnected => "E01001",
            Self::InvalidType => "E01002",
            Self::NonContiguousRow => "E01003",
            Self::NonContiguousReferences => "E01004",
            Self::InvalidConstant => "E01005",
            Self::FWithoutP => "E01006",
            Self::MustBeSource => "E01007",
            Self::MustBeDestination => "E01008",
            Self::IncompatibleTypes => "E01009",
            Self::DisallowedSourceRow => "E01010",
            Self::BReadsAWithF => "E01011",
            Self::OReadsBWithF => "E01012",
            Self::PLengthMismatch => "E01013",
            Self::UReferencedTwice => "E01014",
            Self::UMissingConstant => "E01015",
            Self::NoBoolInput => "E01016",
            Self::DisallowedDestinationRow => "E01017",
            Self::MultipleSources => "E01018",
            Self::MissingBackReference => "E01019",
            Self::FLength => "E01020",
            Self::FNotBool => "E01021",
            Self::PTypeMismatch => "E01022",
        }
    }
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation finding.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Finding {
    /// Category.
    pub code: FindingCode,
    /// Human readable detail.
    pub message: String,
}

impl Finding {
    fn new(code: FindingCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

fn contiguous(indices: &BTreeSet<u8>) -> bool {
    indices
        .iter()
        .enumerate()
        .all(|(i, &idx)| usize::from(idx) == i)
}

impl Wiring {
    /// Check the wiring against every structural rule.
    ///
    /// An empty result means the wiring is valid. Call after
    /// [`normalize`](Self::normalize) for meaningful unconnected-endpoint
    /// findings.
    pub fn validate(&self) -> Vec<Finding> {
        let mut findings = Vec::new();
        let has_f = self.has_f();

        for ep in self.iter() {
            let key = ep.key();

            if !ep.is_connected() {
                findings.push(Finding::new(
                    FindingCode::Unconnected,
                    format!("{key} is not connected to anything"),
                ));
            }
            if !is_valid(ep.ty) {
                findings.push(Finding::new(
                    FindingCode::InvalidType,
                    format!("{key} has invalid type {}", ep.ty),
                ));
            }
            if ep.row == Row::C && ep.class == EndPointClass::Src {
                let value = ep.value.as_deref().unwrap_or_default();
                if !validate_constant(value, ep.ty) {
                    findings.push(Finding::new(
                        FindingCode::InvalidConstant,
                        format!("{key} value {value:?} is not valid for type {}", ep.ty),
                    ));
                }
            }
            if ep.class == EndPointClass::Dst && !ep.row.is_destination() {
                findings.push(Finding::new(
                    FindingCode::MustBeSource,
                    format!("{key} must be a source"),
                ));
            }
            if ep.class == EndPointClass::Src && !ep.row.is_source() {
                findings.push(Finding::new(
                    FindingCode::MustBeDestination,
                    format!("{key} must be a destination"),
                ));
            }

            for &r in &ep.refs {
                let other_key = ep.ref_key(r);
                let back = self
                    .get(other_key)
                    .is_some_and(|other| other.refs.contains(&key.to_ref()));
                let dangling_constant = r.row == Row::C && self.get(other_key).is_none();
                if ep.row == Row::U && dangling_constant {
                    findings.push(Finding::new(
                        FindingCode::UMissingConstant,
                        format!("{key} references missing constant {other_key}"),
                    ));
                } else if !back {
                    findings.push(Finding::new(
                        FindingCode::MissingBackReference,
                        format!("{key} references {other_key} which does not reference it back"),
                    ));
                }
            }

            match ep.class {
                EndPointClass::Dst => self.check_destination(key, has_f, &mut findings),
                EndPointClass::Src => {
                    for r in &ep.refs {
                        if r.row == ep.row || base_sources(ep.row).contains(&r.row) {
                            findings.push(Finding::new(
                                FindingCode::DisallowedDestinationRow,
                                format!("{key} cannot feed {}", ep.ref_key(*r)),
                            ));
                        }
                    }
                }
            }
        }

        self.check_indices(&mut findings);
        self.check_multiple_sources(&mut findings);

        if has_f != self.has_row(Row::P) {
            findings.push(Finding::new(
                FindingCode::FWithoutP,
                "row F and row P must be defined together",
            ));
        }
        if has_f {
            self.check_condition(&mut findings);
        }
        findings
    }

    /// Rules that hold while row F selects between row O and row P.
    fn check_condition(&self, findings: &mut Vec<Finding>) {
        let f = self.count(Row::F, EndPointClass::Dst);
        if f != 1 {
            findings.push(Finding::new(
                FindingCode::FLength,
                format!("row F holds {f} endpoints instead of one"),
            ));
        }
        for ep in self.row(Row::F, EndPointClass::Dst) {
            if ep.ty != BOOL {
                let key = ep.key();
                findings.push(Finding::new(
                    FindingCode::FNotBool,
                    format!("{key} has type {} but row F must be bool", ep.ty),
                ));
            }
        }

        let p = self.count(Row::P, EndPointClass::Dst);
        let o = self.count(Row::O, EndPointClass::Dst);
        if p != o {
            findings.push(Finding::new(
                FindingCode::PLengthMismatch,
                format!("row P length ({p}) differs from row O length ({o})"),
            ));
        }
        for alt in self.row(Row::P, EndPointClass::Dst) {
            let Some(out) = self.get(EndpointKey::dst(Row::O, alt.idx)) else {
                continue;
            };
            if alt.ty != out.ty {
                let (a, b) = (alt.key(), out.key());
                findings.push(Finding::new(
                    FindingCode::PTypeMismatch,
                    format!("{a} type {} differs from {b} type {}", alt.ty, out.ty),
                ));
            }
        }

        let mut inputs = self.row(Row::I, EndPointClass::Src);
        if !inputs.any(|ep| ep.ty == BOOL) {
            findings.push(Finding::new(
                FindingCode::NoBoolInput,
                "row I has no bool source while row F exists",
            ));
        }
    }

    fn check_destination(&self, key: EndpointKey, has_f: bool, findings: &mut Vec<Finding>) {
        let Some(ep) = self.get(key) else {
            return;
        };
        if ep.row == Row::U && ep.refs.len() > 1 {
            findings.push(Finding::new(
                FindingCode::UReferencedTwice,
                format!("{key} references {} sources", ep.refs.len()),
            ));
        }
        for &r in &ep.refs {
            let src_key = ep.ref_key(r);
            if let Some(src) = self.get(src_key) {
                if !compatible(src.ty, ep.ty) {
                    findings.push(Finding::new(
                        FindingCode::IncompatibleTypes,
                        format!("{src_key} type {} cannot feed {key} type {}", src.ty, ep.ty),
                    ));
                }
            }
            if !base_sources(ep.row).contains(&r.row) {
                findings.push(Finding::new(
                    FindingCode::DisallowedSourceRow,
                    format!("{key} cannot read {src_key}"),
                ));
            }
            if has_f && ep.row == Row::B && r.row == Row::A {
                findings.push(Finding::new(
                    FindingCode::BReadsAWithF,
                    format!("{key} cannot read {src_key} while row F exists"),
                ));
            }
            if has_f && ep.row == Row::O && r.row == Row::B {
                findings.push(Finding::new(
                    FindingCode::OReadsBWithF,
                    format!("{key} cannot read {src_key} while row F exists"),
                ));
            }
        }
    }

    fn check_indices(&self, findings: &mut Vec<Finding>) {
        let mut own: BTreeMap<(Row, EndPointClass), BTreeSet<u8>> = BTreeMap::new();
        let mut referenced: BTreeMap<(Row, EndPointClass), BTreeSet<u8>> = BTreeMap::new();
        for ep in self.iter() {
            own.entry((ep.row, ep.class)).or_default().insert(ep.idx);
            for r in &ep.refs {
                referenced
                    .entry((r.row, ep.class.opposite()))
                    .or_default()
                    .insert(r.idx);
            }
        }
        for ((row, class), indices) in &own {
            if !contiguous(indices) {
                findings.push(Finding::new(
                    FindingCode::NonContiguousRow,
                    format!("row {row} {class:?} indices {indices:?} are not contiguous from 0"),
                ));
            }
        }
        for ((row, class), indices) in &referenced {
            if !contiguous(indices) {
                findings.push(Finding::new(
                    FindingCode::NonContiguousReferences,
                    format!("references to row {row} {class:?} {indices:?} skip an index"),
                ));
            }
        }
    }

    fn check_multiple_sources(&self, findings: &mut Vec<Finding>) {
        let mut feeders: BTreeMap<EndpointKey, Vec<EndpointKey>> = BTreeMap::new();
        for src in self.iter().filter(|ep| ep.class == EndPointClass::Src) {
            for r in &src.refs {
                feeders.entry(src.ref_key(*r)).or_default().push(src.key());
            }
        }
        for (dst, srcs) in feeders {
            if srcs.len() > 1 {
                let list: Vec<String> = srcs.iter().map(ToString::to_string).collect();
                findings.push(Finding::new(
                    FindingCode::MultipleSources,
                    format!("{dst} is fed by {}", list.join(", ")),
                ));
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::connection_spec::ConnectionSpec;
    use crate::ep_type::{INT, UNKNOWN};
    use crate::wiring::{Endpoint, EndpointRef};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn codes(w: &Wiring) -> BTreeSet<FindingCode> {
        w.validate().into_iter().map(|f| f.code).collect()
    }

    #[test]
    fn normalized_wiring_is_clean() {
        let spec = ConnectionSpec::from_parts(
            &[
                (Row::A, &[(Row::I, 0, INT)]),
                (Row::O, &[(Row::A, 0, INT), (Row::C, 0, INT)]),
            ],
            &[("12", INT)],
        );
        let mut w = Wiring::from_spec(&spec);
        assert!(w.normalize(&mut StdRng::seed_from_u64(1)));
        assert_eq!(w.validate(), Vec::new());
    }

    #[test]
    fn collects_every_violation() {
        let mut w = Wiring::new();
        w.insert(Endpoint::src(Row::I, 0, INT));
        w.insert(Endpoint::src(Row::I, 2, UNKNOWN));
        w.insert(Endpoint::dst(Row::I, 0, INT));
        w.insert(Endpoint::src(Row::O, 0, INT));
        w.insert(Endpoint::constant(0, INT, "forty"));
        w.insert(Endpoint::dst(Row::F, 0, BOOL));
        let found = codes(&w);
        for code in [
            FindingCode::Unconnected,
            FindingCode::InvalidType,
            FindingCode::NonContiguousRow,
            FindingCode::InvalidConstant,
            FindingCode::FWithoutP,
            FindingCode::MustBeSource,
            FindingCode::MustBeDestination,
            FindingCode::NoBoolInput,
        ] {
            assert!(found.contains(&code), "missing {code}");
        }
    }

    #[test]
    fn routing_rules() {
        let mut w = Wiring::new();
        w.insert(Endpoint::src(Row::I, 0, BOOL));
        w.insert(Endpoint::src(Row::A, 0, INT));
        w.insert(Endpoint::src(Row::B, 0, INT));
        w.insert(Endpoint::dst(Row::F, 0, BOOL));
        w.insert(Endpoint::dst(Row::A, 0, INT));
        w.insert(Endpoint::dst(Row::B, 0, INT));
        w.insert(Endpoint::dst(Row::O, 0, BOOL));
        w.insert(Endpoint::dst(Row::P, 0, INT));
        w.insert(Endpoint::dst(Row::P, 1, INT));
        assert!(w.connect(EndpointKey::dst(Row::F, 0), EndpointKey::src(Row::I, 0)));
        assert!(w.connect(EndpointKey::dst(Row::A, 0), EndpointKey::src(Row::B, 0)));
        assert!(w.connect(EndpointKey::dst(Row::B, 0), EndpointKey::src(Row::A, 0)));
        assert!(w.connect(EndpointKey::dst(Row::O, 0), EndpointKey::src(Row::B, 0)));
        assert!(w.connect(EndpointKey::dst(Row::P, 0), EndpointKey::src(Row::B, 0)));
        assert!(w.connect(EndpointKey::dst(Row::P, 1), EndpointKey::src(Row::B, 0)));
        let found = codes(&w);
        for code in [
            FindingCode::DisallowedSourceRow,
            FindingCode::DisallowedDestinationRow,
            FindingCode::BReadsAWithF,
            FindingCode::OReadsBWithF,
            FindingCode::IncompatibleTypes,
            FindingCode::PLengthMismatch,
        ] {
            assert!(found.contains(&code), "missing {code}");
        }
        assert!(!found.contains(&FindingCode::FWithoutP));
        assert!(!found.contains(&FindingCode::NoBoolInput));
    }

    #[test]
    fn reference_bookkeeping_rules() {
        let mut w = Wiring::new();
        let mut i0 = Endpoint::src(Row::I, 0, INT);
        i0.refs.push(EndpointRef::new(Row::O, 0));
        let mut i1 = Endpoint::src(Row::I, 1, INT);
        i1.refs.push(EndpointRef::new(Row::O, 0));
        let mut o0 = Endpoint::dst(Row::O, 0, INT);
        o0.refs.push(EndpointRef::new(Row::I, 0));
        let mut u0 = Endpoint::dst(Row::U, 0, INT);
        u0.refs.push(EndpointRef::new(Row::C, 4));
        u0.refs.push(EndpointRef::new(Row::I, 3));
        w.insert(i0);
        w.insert(i1);
        w.insert(o0);
        w.insert(u0);
        let found = codes(&w);
        for code in [
            FindingCode::MultipleSources,
            FindingCode::MissingBackReference,
            FindingCode::UReferencedTwice,
            FindingCode::UMissingConstant,
            FindingCode::NonContiguousReferences,
        ] {
            assert!(found.contains(&code), "missing {code}");
        }
        assert_eq!(FindingCode::MultipleSources.as_str(), "E01018");
    }

    #[test]
    fn condition_rows_follow_row_o() {
        let mut w = Wiring::new();
        w.insert(Endpoint::src(Row::I, 0, BOOL));
        w.insert(Endpoint::src(Row::I, 1, INT));
        w.insert(Endpoint::dst(Row::F, 0, INT));
        w.insert(Endpoint::dst(Row::F, 1, BOOL));
        w.insert(Endpoint::dst(Row::O, 0, INT));
        w.insert(Endpoint::dst(Row::P, 0, BOOL));
        let found = codes(&w);
        for code in [
            FindingCode::FLength,
            FindingCode::FNotBool,
            FindingCode::PTypeMismatch,
        ] {
            assert!(found.contains(&code), "missing {code}");
        }
        assert_eq!(FindingCode::PTypeMismatch.as_str(), "E01022");

        let mut w = Wiring::new();
        w.insert(Endpoint::src(Row::I, 0, BOOL));
        w.insert(Endpoint::dst(Row::F, 0, BOOL));
        w.insert(Endpoint::dst(Row::O, 0, INT));
        w.insert(Endpoint::dst(Row::P, 0, INT));
        let found = codes(&w);
        assert!(!found.contains(&FindingCode::FLength));
        assert!(!found.contains(&FindingCode::FNotBool));
        assert!(!found.contains(&FindingCode::PTypeMismatch));
    }
}
