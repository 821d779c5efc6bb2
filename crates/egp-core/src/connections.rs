// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Compact connection tables.
//!
//! A table holds one column per destination endpoint and four `u8` rows:
//! source row, destination row, source index, destination index. The rows are
//! stored back to back in a single allocation so the whole table hashes and
//! compares as one byte string.

use crate::error::GraphError;
use crate::interface::MAX_ENDPOINTS;
use crate::row::Row;

/// One directed edge.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Connection {
    /// Row of the source endpoint.
    pub src_row: Row,
    /// Row of the destination endpoint.
    pub dst_row: Row,
    /// Index of the source endpoint within its row.
    pub src_idx: u8,
    /// Index of the destination endpoint within its row.
    pub dst_idx: u8,
}

/// Every connection of one graph, stored column-wise.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct ConnectionTable {
    data: Box<[u8]>,
}

const SRC_ROW: usize = 0;
const DST_ROW: usize = 1;
const SRC_IDX: usize = 2;
const DST_IDX: usize = 3;

impl ConnectionTable {
    /// Build a table from connections.
    ///
    /// Destination indices must be contiguous from zero within each
    /// destination row, in the order given.
    pub fn new(connections: &[Connection]) -> Result<Self, GraphError> {
        let n = connections.len();
        let mut next_dst = [0_usize; 8];
        let mut data = vec![0_u8; n * 4];
        for (col, c) in connections.iter().enumerate() {
            let expected = &mut next_dst[usize::from(c.dst_row.as_u8())];
            if usize::from(c.dst_idx) != *expected {
                return Err(GraphError::NonContiguous {
                    row: c.dst_row,
                    idx: c.dst_idx,
                });
            }
            *expected += 1;
            if *expected > MAX_ENDPOINTS {
                return Err(GraphError::TooManyEndpoints { len: *expected });
            }
            data[SRC_ROW * n + col] = c.src_row.as_u8();
            data[DST_ROW * n + col] = c.dst_row.as_u8();
            data[SRC_IDX * n + col] = c.src_idx;
            data[DST_IDX * n + col] = c.dst_idx;
        }
        Ok(Self {
            data: data.into_boxed_slice(),
        })
    }

    /// Number of connections (destination endpoints).
    pub fn len(&self) -> usize {
        self.data.len() / 4
    }

    /// Returns `true` if the table has no connections.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Connection in column `col`.
    pub fn get(&self, col: usize) -> Option<Connection> {
        let n = self.len();
        if col >= n {
            return None;
        }
        Some(Connection {
            src_row: Row::from_u8(self.data[SRC_ROW * n + col])?,
            dst_row: Row::from_u8(self.data[DST_ROW * n + col])?,
            src_idx: self.data[SRC_IDX * n + col],
            dst_idx: self.data[DST_IDX * n + col],
        })
    }

    /// Iterate connections in column order.
    pub fn iter(&self) -> impl Iterator<Item = Connection> + '_ {
        (0..self.len()).filter_map(|col| self.get(col))
    }

    /// Raw table bytes (four rows back to back).
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn conn(src_row: Row, src_idx: u8, dst_row: Row, dst_idx: u8) -> Connection {
        Connection {
            src_row,
            dst_row,
            src_idx,
            dst_idx,
        }
    }

    #[test]
    fn column_layout() {
        let conns = [conn(Row::I, 0, Row::O, 0), conn(Row::C, 3, Row::O, 1)];
        let table = ConnectionTable::new(&conns).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.as_bytes(), &[0, 1, 5, 5, 0, 3, 0, 1]);
        assert_eq!(table.get(1), Some(conn(Row::C, 3, Row::O, 1)));
        assert_eq!(table.get(2), None);
        assert_eq!(table.iter().count(), 2);
    }

    #[test]
    fn rejects_gaps_in_destination_indices() {
        let gap = [conn(Row::I, 0, Row::O, 1)];
        let err = ConnectionTable::new(&gap).unwrap_err();
        let expected = GraphError::NonContiguous {
            row: Row::O,
            idx: 1,
        };
        assert_eq!(err, expected);
    }

    #[test]
    fn equal_content_is_equal() {
        let a = ConnectionTable::new(&[conn(Row::I, 0, Row::A, 0)]).unwrap();
        let b = ConnectionTable::new(&[conn(Row::I, 0, Row::A, 0)]).unwrap();
        assert_eq!(a, b);
        assert!(ConnectionTable::default().is_empty());
    }
}
