// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Immutable endpoint type sequences.

use std::sync::{Arc, OnceLock};

use crate::ep_type::EndPointType;
use crate::error::GraphError;

/// Maximum number of endpoints on one side of one row.
pub const MAX_ENDPOINTS: usize = 256;

/// Ordered endpoint types for one (row, class) pair.
///
/// Equality and hashing are structural so identical interfaces from
/// different genetic codes can be collapsed onto one shared allocation.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Interface(Box<[EndPointType]>);

impl Interface {
    /// Build an interface, rejecting more than [`MAX_ENDPOINTS`] entries.
    pub fn new(types: impl Into<Vec<EndPointType>>) -> Result<Self, GraphError> {
        let types = types.into();
        if types.len() > MAX_ENDPOINTS {
            return Err(GraphError::TooManyEndpoints { len: types.len() });
        }
        Ok(Self(types.into_boxed_slice()))
    }

    /// Endpoint types in index order.
    pub fn types(&self) -> &[EndPointType] {
        &self.0
    }

    /// Number of endpoints.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the interface has no endpoints.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Type of endpoint `idx`.
    pub fn get(&self, idx: usize) -> Option<EndPointType> {
        self.0.get(idx).copied()
    }

    /// Canonical byte encoding: little-endian `u16` length then each type as
    /// little-endian `i16`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.0.len() * 2);
        // MAX_ENDPOINTS fits in u16.
        #[allow(clippy::cast_possible_truncation)]
        out.extend_from_slice(&(self.0.len() as u16).to_le_bytes());
        for ty in self.0.iter() {
            out.extend_from_slice(&ty.to_le_bytes());
        }
        out
    }
}

/// The process-wide shared empty interface.
pub fn empty_interface() -> Arc<Interface> {
    static EMPTY: OnceLock<Arc<Interface>> = OnceLock::new();
    Arc::clone(EMPTY.get_or_init(|| Arc::new(Interface::default())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ep_type::{BOOL, INT};

    #[test]
    fn rejects_oversized_interfaces() {
        assert!(Interface::new(vec![INT; MAX_ENDPOINTS]).is_ok());
        let err = Interface::new(vec![INT; MAX_ENDPOINTS + 1]).unwrap_err();
        let expected = GraphError::TooManyEndpoints {
            len: MAX_ENDPOINTS + 1,
        };
        assert_eq!(err, expected);
    }

    #[test]
    fn equality_is_structural() {
        let a = Interface::new(vec![INT, BOOL]).unwrap();
        let b = Interface::new(vec![INT, BOOL]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Interface::new(vec![BOOL, INT]).unwrap());
        assert_eq!(a.get(1), Some(BOOL));
        assert_eq!(a.get(2), None);
    }

    #[test]
    fn byte_encoding_is_length_prefixed() {
        let iface = Interface::new(vec![INT, -2]).unwrap();
        assert_eq!(iface.to_bytes(), vec![2, 0, 2, 0, 0xFE, 0xFF]);
        assert_eq!(Interface::default().to_bytes(), vec![0, 0]);
    }

    #[test]
    fn empty_interface_is_shared() {
        assert!(Arc::ptr_eq(&empty_interface(), &empty_interface()));
        assert!(empty_interface().is_empty());
    }
}
