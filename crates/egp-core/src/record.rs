// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Declarative genetic code records and their CBOR encoding.
//!
//! A [`GcRecord`] is the form in which genetic codes enter the cache and leave
//! it for the gene pool. Dependencies are named by signature, never by slot.

use serde::{Deserialize, Serialize};

use crate::connection_spec::ConnectionSpec;
use crate::error::CodecError;
use crate::genetic_code::{DependencyField, Usage};
use crate::ident::Signature;
use crate::properties::Properties;

/// Declarative description of one genetic code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcRecord {
    /// Content signature. Required for codons; derived when absent otherwise.
    #[serde(default)]
    pub signature: Option<Signature>,
    /// Sub-graph A.
    #[serde(default)]
    pub gca: Option<Signature>,
    /// Sub-graph B.
    #[serde(default)]
    pub gcb: Option<Signature>,
    /// First ancestor.
    #[serde(default)]
    pub ancestor_a: Option<Signature>,
    /// Second ancestor.
    #[serde(default)]
    pub ancestor_b: Option<Signature>,
    /// Row-keyed connection specification.
    pub graph: ConnectionSpec,
    /// Generation. Used when the sub-graphs are not resident.
    #[serde(default)]
    pub generation: u64,
    /// Usage statistics.
    #[serde(default)]
    pub usage: Usage,
    /// Property flags.
    #[serde(default)]
    pub properties: Properties,
}

impl GcRecord {
    /// Record with only a graph; every other field takes its default.
    pub fn from_graph(graph: ConnectionSpec) -> Self {
        Self {
            signature: None,
            gca: None,
            gcb: None,
            ancestor_a: None,
            ancestor_b: None,
            graph,
            generation: 0,
            usage: Usage::default(),
            properties: Properties::default(),
        }
    }

    /// Signature named by a dependency field.
    pub const fn dependency(&self, field: DependencyField) -> Option<Signature> {
        match field {
            DependencyField::Gca => self.gca,
            DependencyField::Gcb => self.gcb,
            DependencyField::AncestorA => self.ancestor_a,
            DependencyField::AncestorB => self.ancestor_b,
        }
    }

    /// Returns `true` if the record has neither sub-graph.
    pub const fn is_codon(&self) -> bool {
        self.gca.is_none() && self.gcb.is_none()
    }
}

/// Encode a record as CBOR.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialisation fails.
pub fn encode_record(record: &GcRecord) -> Result<Vec<u8>, CodecError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(record, &mut bytes).map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Decode a CBOR record.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] on malformed input.
pub fn decode_record(bytes: &[u8]) -> Result<GcRecord, CodecError> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ep_type::INT;
    use crate::row::Row;

    #[test]
    fn json_record_fills_defaults() {
        let text = r#"{"graph": {"O": [["I", 0, 2]]}, "gca": null}"#;
        let record: GcRecord = serde_json::from_str(text).unwrap();
        assert!(record.is_codon());
        assert_eq!(record.usage, Usage::default());
        assert_eq!(record.graph.row(Row::O)[0].ty, INT);
    }

    #[test]
    fn decode_rejects_garbage() {
        let decoded = decode_record(&[0xff, 0x00, 0x13]);
        assert!(matches!(decoded, Err(CodecError::Decode(_))));
    }
}
