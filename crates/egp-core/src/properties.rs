// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Genetic code property flags.

use serde::{Deserialize, Serialize};

/// Property bitfield of a genetic code.
///
/// Low 16 bits describe behaviour, bits 16 and up describe the kind of
/// computation performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(pub u64);

impl Properties {
    /// Calls other genetic codes outside its own graph.
    pub const EXTENDED: u64 = 1 << 0;
    /// Always produces the same outputs and ignores its inputs.
    pub const CONSTANT: u64 = 1 << 1;
    /// Has a row F.
    pub const CONDITIONAL: u64 = 1 << 2;
    /// Same inputs give same outputs.
    pub const DETERMINISTIC: u64 = 1 << 3;
    /// Modifies memory outside its own scope.
    pub const MEMORY_MODIFY: u64 = 1 << 4;
    /// Modifies its input objects.
    pub const OBJECT_MODIFY: u64 = 1 << 5;
    /// Has physical side effects.
    pub const PHYSICAL: u64 = 1 << 6;
    /// Arithmetic operation.
    pub const ARITHMETIC: u64 = 1 << 16;
    /// Logical operation.
    pub const LOGICAL: u64 = 1 << 17;
    /// Bitwise operation.
    pub const BITWISE: u64 = 1 << 18;
    /// Boolean operation.
    pub const BOOLEAN: u64 = 1 << 19;
    /// Sequence operation.
    pub const SEQUENCE: u64 = 1 << 20;

    const NAMES: [(u64, &'static str); 12] = [
        (Self::EXTENDED, "extended"),
        (Self::CONSTANT, "constant"),
        (Self::CONDITIONAL, "conditional"),
        (Self::DETERMINISTIC, "deterministic"),
        (Self::MEMORY_MODIFY, "memory_modify"),
        (Self::OBJECT_MODIFY, "object_modify"),
        (Self::PHYSICAL, "physical"),
        (Self::ARITHMETIC, "arithmetic"),
        (Self::LOGICAL, "logical"),
        (Self::BITWISE, "bitwise"),
        (Self::BOOLEAN, "boolean"),
        (Self::SEQUENCE, "sequence"),
    ];

    /// Create flags from raw bits.
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns `true` if every bit of `flag` is set.
    #[inline]
    pub const fn contains(self, flag: u64) -> bool {
        self.0 & flag == flag
    }

    /// Copy with `flag` set.
    #[inline]
    pub const fn with(self, flag: u64) -> Self {
        Self(self.0 | flag)
    }

    /// Names of the set flags in bit order.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, n)| *n)
            .collect()
    }

    /// Build from flag names; unknown names are ignored.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names.into_iter().fold(Self::default(), |acc, name| {
            Self::NAMES
                .iter()
                .find(|(_, n)| *n == name)
                .map_or(acc, |(bit, _)| acc.with(*bit))
        })
    }
}
