// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Compact, immutable genetic code graphs.
//!
//! A [`Graph`] pairs a [`RowSet`] with a [`ConnectionTable`] and the literal
//! values of row C. All three parts sit behind `Arc` so the cache can collapse
//! structurally equal parts of different graphs onto a single allocation. No
//! method mutates a shared part; the `with_*` methods return new graphs.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::connection_spec::{ConnectionSpec, Constant, SourceRef};
use crate::connections::{Connection, ConnectionTable};
use crate::ep_type::{EndPointType, UNKNOWN};
use crate::error::GraphError;
use crate::interface::Interface;
use crate::row::{EndPointClass, Row};
use crate::rows::RowSet;

/// Wiring of one genetic code.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Graph {
    rows: Arc<RowSet>,
    connections: Arc<ConnectionTable>,
    constants: Arc<[String]>,
}

impl Graph {
    /// Build a graph from a declarative connection specification.
    ///
    /// Destination interfaces come straight from the connection spec. Source
    /// interfaces for rows I, A and B are inferred from the references made to
    /// them; an index that is never referenced gets the [`UNKNOWN`] type.
    pub fn from_spec(spec: &ConnectionSpec) -> Result<Self, GraphError> {
        spec.check()?;
        let mut connections = Vec::new();
        let mut pairs = Vec::new();
        let mut referenced: BTreeMap<Row, BTreeMap<u8, EndPointType>> = BTreeMap::new();

        for (&row, refs) in &spec.rows {
            let mut types = Vec::with_capacity(refs.len());
            for (dst_idx, src) in (0..=u8::MAX).zip(refs.iter()) {
                connections.push(Connection {
                    src_row: src.row,
                    dst_row: row,
                    src_idx: src.idx,
                    dst_idx,
                });
                types.push(src.ty);
                if src.row != Row::C {
                    referenced
                        .entry(src.row)
                        .or_default()
                        .entry(src.idx)
                        .or_insert(src.ty);
                }
            }
            pairs.push((row, EndPointClass::Dst, Interface::new(types)?));
        }

        for (row, by_idx) in referenced {
            if let Some(&max) = by_idx.keys().next_back() {
                let types: Vec<EndPointType> = (0..=max)
                    .map(|i| by_idx.get(&i).copied().unwrap_or(UNKNOWN))
                    .collect();
                pairs.push((row, EndPointClass::Src, Interface::new(types)?));
            }
        }

        let constant_types: Vec<EndPointType> = spec.constants.iter().map(|c| c.ty).collect();
        pairs.push((Row::C, EndPointClass::Src, Interface::new(constant_types)?));

        Ok(Self {
            rows: Arc::new(RowSet::from_pairs(pairs)),
            connections: Arc::new(ConnectionTable::new(&connections)?),
            constants: spec.constants.iter().map(|c| c.value.clone()).collect(),
        })
    }

    /// Regenerate the declarative connection specification.
    pub fn to_spec(&self) -> ConnectionSpec {
        let mut spec = ConnectionSpec::default();
        for c in self.connections.iter() {
            let ty = self
                .rows
                .get(c.dst_row, EndPointClass::Dst)
                .get(usize::from(c.dst_idx))
                .unwrap_or(UNKNOWN);
            let source = SourceRef {
                row: c.src_row,
                idx: c.src_idx,
                ty,
            };
            spec.rows.entry(c.dst_row).or_default().push(source);
        }
        spec.constants = self
            .rows
            .get(Row::C, EndPointClass::Src)
            .types()
            .iter()
            .zip(self.constants.iter())
            .map(|(&ty, value)| Constant {
                value: value.clone(),
                ty,
            })
            .collect();
        spec
    }

    /// The interface set.
    pub fn rows(&self) -> &Arc<RowSet> {
        &self.rows
    }

    /// The connection table.
    pub fn connections(&self) -> &Arc<ConnectionTable> {
        &self.connections
    }

    /// Literal values of row C in index order.
    pub fn constants(&self) -> &[String] {
        &self.constants
    }

    /// Interface of row I (the genetic code's inputs).
    pub fn inputs(&self) -> &Interface {
        self.rows.get(Row::I, EndPointClass::Src)
    }

    /// Interface of row O (the genetic code's outputs).
    pub fn outputs(&self) -> &Interface {
        self.rows.get(Row::O, EndPointClass::Dst)
    }

    /// Returns `true` if row F is present, which implies row P.
    pub fn has_f(&self) -> bool {
        !self.rows.get(Row::F, EndPointClass::Dst).is_empty()
    }

    /// Same graph over a different (structurally equal) row set.
    pub fn with_rows(&self, rows: Arc<RowSet>) -> Self {
        debug_assert_eq!(*rows, *self.rows, "row set swap must preserve content");
        Self {
            rows,
            connections: Arc::clone(&self.connections),
            constants: Arc::clone(&self.constants),
        }
    }

    /// Same graph over a different (structurally equal) connection table.
    pub fn with_connections(&self, connections: Arc<ConnectionTable>) -> Self {
        debug_assert_eq!(
            *connections,
            *self.connections,
            "connection swap must preserve content"
        );
        Self {
            rows: Arc::clone(&self.rows),
            connections,
            constants: Arc::clone(&self.constants),
        }
    }

    /// Returns `true` if both graphs point at the same three allocations.
    pub fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.rows, &other.rows)
            && Arc::ptr_eq(&self.connections, &other.connections)
            && Arc::ptr_eq(&self.constants, &other.constants)
    }

    /// Feed the canonical content of this graph into `hasher`.
    pub(crate) fn hash_content(&self, hasher: &mut blake3::Hasher) {
        for (_, _, iface) in self.rows.iter() {
            hasher.update(&iface.to_bytes());
        }
        hasher.update(&(self.connections.len() as u64).to_le_bytes());
        hasher.update(self.connections.as_bytes());
        for value in self.constants.iter() {
            hasher.update(&(value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }
    }
}
