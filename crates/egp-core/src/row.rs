// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph rows and the static source/destination eligibility tables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A row of a genetic code graph.
///
/// The discriminant is the compact wire value stored in connection tables.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Row {
    /// Inputs.
    I = 0,
    /// Constants.
    C = 1,
    /// Sub-graph A interface.
    A = 2,
    /// Sub-graph B interface.
    B = 3,
    /// Conditional flag.
    F = 4,
    /// Outputs.
    O = 5,
    /// Outputs taken when the flag is set.
    P = 6,
    /// Catch-all for otherwise unreferenced sources.
    U = 7,
}

/// Whether an endpoint produces or consumes a value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum EndPointClass {
    /// Feeds destination endpoints.
    Src,
    /// Fed by exactly one source endpoint.
    Dst,
}

impl EndPointClass {
    /// The class on the other end of a connection.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Src => Self::Dst,
            Self::Dst => Self::Src,
        }
    }
}

/// Rows that may hold source endpoints.
pub const SOURCE_ROWS: [Row; 4] = [Row::I, Row::C, Row::A, Row::B];
/// Rows that may hold destination endpoints.
pub const DESTINATION_ROWS: [Row; 6] = [Row::A, Row::B, Row::F, Row::O, Row::P, Row::U];
/// Every row in canonical order.
pub const ALL_ROWS: [Row; 8] = [
    Row::I, Row::C, Row::A, Row::B, Row::F, Row::O, Row::P, Row::U,
];

impl Row {
    /// All rows in canonical order.
    pub const ALL: [Row; 8] = ALL_ROWS;

    /// Compact wire value.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Inverse of [`Row::as_u8`].
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::I),
            1 => Some(Self::C),
            2 => Some(Self::A),
            3 => Some(Self::B),
            4 => Some(Self::F),
            5 => Some(Self::O),
            6 => Some(Self::P),
            7 => Some(Self::U),
            _ => None,
        }
    }

    /// Single letter label.
    pub const fn as_char(self) -> char {
        match self {
            Self::I => 'I',
            Self::C => 'C',
            Self::A => 'A',
            Self::B => 'B',
            Self::F => 'F',
            Self::O => 'O',
            Self::P => 'P',
            Self::U => 'U',
        }
    }

    /// Parse a single letter label.
    pub fn from_label(label: &str) -> Option<Self> {
        let mut chars = label.chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        ALL_ROWS.into_iter().find(|r| r.as_char() == c)
    }

    /// Returns `true` if the row can hold source endpoints.
    pub const fn is_source(self) -> bool {
        matches!(self, Self::I | Self::C | Self::A | Self::B)
    }

    /// Returns `true` if the row can hold destination endpoints.
    pub const fn is_destination(self) -> bool {
        matches!(
            self,
            Self::A | Self::B | Self::F | Self::O | Self::P | Self::U
        )
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Source rows a destination row may be connected to, ignoring row F.
///
/// Source rows themselves (I, C) have no eligible sources.
pub const fn base_sources(row: Row) -> &'static [Row] {
    match row {
        Row::I | Row::C => &[],
        Row::A => &[Row::I, Row::C],
        Row::B => &[Row::I, Row::C, Row::A],
        Row::U | Row::O => &[Row::I, Row::C, Row::A, Row::B],
        Row::P => &[Row::I, Row::C, Row::B],
        Row::F => &[Row::I],
    }
}

/// Source rows a destination row may be connected to.
///
/// When row F is present the two branches must be independent: B takes A's
/// sources and O takes B's sources.
pub const fn valid_sources(row: Row, has_f: bool) -> &'static [Row] {
    match (row, has_f) {
        (Row::B, true) => base_sources(Row::A),
        (Row::O, true) => base_sources(Row::B),
        _ => base_sources(row),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_round_trip() {
        for row in ALL_ROWS {
            assert_eq!(Row::from_u8(row.as_u8()), Some(row));
            assert_eq!(Row::from_label(&row.to_string()), Some(row));
        }
        assert_eq!(Row::from_u8(8), None);
        assert_eq!(Row::from_label("IC"), None);
    }

    #[test]
    fn f_reroutes_b_and_o() {
        assert_eq!(valid_sources(Row::B, false), &[Row::I, Row::C, Row::A]);
        assert_eq!(valid_sources(Row::B, true), &[Row::I, Row::C]);
        assert_eq!(valid_sources(Row::O, true), &[Row::I, Row::C, Row::A]);
        assert_eq!(valid_sources(Row::P, true), &[Row::I, Row::C, Row::B]);
        assert_eq!(valid_sources(Row::F, true), &[Row::I]);
    }

    #[test]
    fn classes() {
        assert!(SOURCE_ROWS.iter().all(|r| r.is_source()));
        assert!(DESTINATION_ROWS.iter().all(|r| r.is_destination()));
        assert!(!Row::U.is_source());
        assert_eq!(EndPointClass::Src.opposite(), EndPointClass::Dst);
    }
}
