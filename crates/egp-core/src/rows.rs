// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The set of interfaces making up one graph.

use std::sync::{Arc, OnceLock};

use crate::interface::{empty_interface, Interface};
use crate::row::{EndPointClass, Row};

/// Number of (row, class) interface slots.
pub const ROW_SET_SLOTS: usize = 10;

const SLOTS: [(Row, EndPointClass); ROW_SET_SLOTS] = [
    (Row::I, EndPointClass::Src),
    (Row::C, EndPointClass::Src),
    (Row::A, EndPointClass::Src),
    (Row::B, EndPointClass::Src),
    (Row::A, EndPointClass::Dst),
    (Row::B, EndPointClass::Dst),
    (Row::F, EndPointClass::Dst),
    (Row::O, EndPointClass::Dst),
    (Row::P, EndPointClass::Dst),
    (Row::U, EndPointClass::Dst),
];

/// Slot index of a (row, class) pair, if that pair can exist.
pub fn slot_of(row: Row, class: EndPointClass) -> Option<usize> {
    SLOTS.iter().position(|&s| s == (row, class))
}

/// Interfaces for rows I, C, A, B (sources) and A, B, F, O, P, U (destinations).
///
/// Unused slots point at the shared empty interface. Equality and hashing
/// compare interface content, not allocation identity.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct RowSet {
    interfaces: [Arc<Interface>; ROW_SET_SLOTS],
}

impl Default for RowSet {
    fn default() -> Self {
        Self {
            interfaces: std::array::from_fn(|_| empty_interface()),
        }
    }
}

impl RowSet {
    /// Build from an interface per (row, class) pair. Pairs not listed are empty.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (Row, EndPointClass, Interface)>,
    ) -> Self {
        let mut set = Self::default();
        for (row, class, iface) in pairs {
            if let Some(slot) = slot_of(row, class) {
                if !iface.is_empty() {
                    set.interfaces[slot] = Arc::new(iface);
                }
            }
        }
        set
    }

    /// Interface for `(row, class)`; the empty interface for pairs that cannot exist.
    pub fn get(&self, row: Row, class: EndPointClass) -> &Interface {
        match slot_of(row, class) {
            Some(slot) => &self.interfaces[slot],
            None => empty(),
        }
    }

    /// Shared handle to the interface in `slot`.
    pub fn slot(&self, slot: usize) -> Option<&Arc<Interface>> {
        self.interfaces.get(slot)
    }

    /// All slots with their (row, class) pair.
    pub fn iter(&self) -> impl Iterator<Item = (Row, EndPointClass, &Arc<Interface>)> + '_ {
        SLOTS
            .iter()
            .zip(self.interfaces.iter())
            .map(|(&(r, c), i)| (r, c, i))
    }

    /// Copy with every interface replaced by `canon(interface)`.
    ///
    /// Used by cache deduplication to point equal interfaces at one allocation.
    pub fn with_interfaces(
        &self,
        mut canon: impl FnMut(&Arc<Interface>) -> Arc<Interface>,
    ) -> Self {
        Self {
            interfaces: std::array::from_fn(|slot| canon(&self.interfaces[slot])),
        }
    }

    /// Returns `true` if every slot of `self` shares its allocation with `other`.
    pub fn shares_interfaces(&self, other: &Self) -> bool {
        self.interfaces
            .iter()
            .zip(other.interfaces.iter())
            .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

fn empty() -> &'static Interface {
    static EMPTY: OnceLock<Interface> = OnceLock::new();
    EMPTY.get_or_init(Interface::default)
}
