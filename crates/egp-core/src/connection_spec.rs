// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Row-keyed declarative connection specification.
//!
//! This is the graph shape carried in records and JSON files:
//!
//! ```json
//! {
//!   "A": [["C", 5, 2], ["I", 1, 2]],
//!   "O": [["A", 0, 2]],
//!   "C": [["42", 2], ["64", 2]]
//! }
//! ```
//!
//! Every destination row maps to a list of `[source_row, source_index, type]`
//! triples, one per destination endpoint in index order. Row `C` instead
//! lists `[literal, type]` pairs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ep_type::EndPointType;
use crate::error::GraphError;
use crate::row::Row;

/// The source feeding one destination endpoint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SourceRef {
    /// Source row.
    pub row: Row,
    /// Source index.
    pub idx: u8,
    /// Type of the destination endpoint.
    pub ty: EndPointType,
}

/// A row C endpoint.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Constant {
    /// Literal expression.
    pub value: String,
    /// Endpoint type.
    pub ty: EndPointType,
}

/// Declarative connection specification for one genetic code.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "JsonGraph", into = "JsonGraph")]
pub struct ConnectionSpec {
    /// Destination rows and the source feeding each of their endpoints.
    pub rows: BTreeMap<Row, Vec<SourceRef>>,
    /// Row C.
    pub constants: Vec<Constant>,
}

impl ConnectionSpec {
    /// Build a specification from literal tuples.
    ///
    /// Convenient for fixtures; rows with an empty list are dropped.
    pub fn from_parts(
        rows: &[(Row, &[(Row, u8, EndPointType)])],
        constants: &[(&str, EndPointType)],
    ) -> Self {
        let rows = rows
            .iter()
            .filter(|(_, refs)| !refs.is_empty())
            .map(|(row, refs)| {
                let refs: Vec<SourceRef> = refs
                    .iter()
                    .map(|&(row, idx, ty)| SourceRef { row, idx, ty })
                    .collect();
                (*row, refs)
            })
            .collect();
        let constants = constants
            .iter()
            .map(|&(value, ty)| Constant {
                value: value.to_owned(),
                ty,
            })
            .collect();
        Self { rows, constants }
    }

    /// Sources feeding `row`, empty if the row is absent.
    pub fn row(&self, row: Row) -> &[SourceRef] {
        self.rows.get(&row).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if `row` is present. Row C counts when it has constants.
    pub fn has_row(&self, row: Row) -> bool {
        if row == Row::C {
            return !self.constants.is_empty();
        }
        self.rows.get(&row).is_some_and(|refs| !refs.is_empty())
    }

    /// Structural sanity checks that do not need the endpoint model.
    pub fn check(&self) -> Result<(), GraphError> {
        for (row, refs) in &self.rows {
            if !row.is_destination() {
                return Err(GraphError::NotADestination(*row));
            }
            if refs.len() > crate::interface::MAX_ENDPOINTS {
                return Err(GraphError::TooManyEndpoints { len: refs.len() });
            }
            for src in refs {
                if !src.row.is_source() {
                    return Err(GraphError::NotASource(src.row));
                }
                if src.row == Row::C && usize::from(src.idx) >= self.constants.len() {
                    return Err(GraphError::ConstantOutOfRange {
                        idx: src.idx,
                        len: self.constants.len(),
                    });
                }
            }
        }
        if self.constants.len() > crate::interface::MAX_ENDPOINTS {
            return Err(GraphError::TooManyEndpoints {
                len: self.constants.len(),
            });
        }
        Ok(())
    }
}

/// JSON-shaped entry. Triples are connections, pairs are constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum JsonEntry {
    Connection(String, u8, EndPointType),
    Constant(String, EndPointType),
}

type JsonGraph = BTreeMap<String, Vec<JsonEntry>>;

impl TryFrom<JsonGraph> for ConnectionSpec {
    type Error = GraphError;

    fn try_from(json: JsonGraph) -> Result<Self, Self::Error> {
        let mut spec = Self::default();
        for (label, entries) in json {
            let row = Row::from_label(&label)
                .ok_or_else(|| GraphError::BadEntry(format!("unknown row {label:?}")))?;
            if row == Row::C {
                for entry in entries {
                    match entry {
                        JsonEntry::Constant(value, ty) => {
                            spec.constants.push(Constant { value, ty });
                        }
                        JsonEntry::Connection(..) => {
                            let msg = "row C holds [literal, type] pairs";
                            return Err(GraphError::BadEntry(msg.into()));
                        }
                    }
                }
                continue;
            }
            let mut refs = Vec::with_capacity(entries.len());
            for entry in entries {
                match entry {
                    JsonEntry::Connection(src, idx, ty) => {
                        let src_row = Row::from_label(&src)
                            .ok_or_else(|| GraphError::BadEntry(format!("unknown row {src:?}")))?;
                        refs.push(SourceRef {
                            row: src_row,
                            idx,
                            ty,
                        });
                    }
                    JsonEntry::Constant(..) => {
                        return Err(GraphError::BadEntry(format!(
                            "row {row} holds [row, index, type] triples"
                        )))
                    }
                }
            }
            spec.rows.insert(row, refs);
        }
        spec.check()?;
        Ok(spec)
    }
}

impl From<ConnectionSpec> for JsonGraph {
    fn from(spec: ConnectionSpec) -> Self {
        let mut json = Self::new();
        for (row, refs) in spec.rows {
            json.insert(
                row.to_string(),
                refs.into_iter()
                    .map(|s| JsonEntry::Connection(s.row.to_string(), s.idx, s.ty))
                    .collect(),
            );
        }
        if !spec.constants.is_empty() {
            json.insert(
                Row::C.to_string(),
                spec.constants
                    .into_iter()
                    .map(|c| JsonEntry::Constant(c.value, c.ty))
                    .collect(),
            );
        }
        json
    }
}
