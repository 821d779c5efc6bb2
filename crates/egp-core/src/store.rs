// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Gene pool port.
//!
//! The cache pushes dirty entries to a [`GenePool`] before it reclaims their
//! slots and pulls records back by signature when a purged dependency is
//! needed again. [`MemoryGenePool`] is the in-process tier used by tests and
//! the CLI.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::ident::Signature;
use crate::record::{decode_record, encode_record, GcRecord};

/// Persistent store of genetic code records keyed by signature.
///
/// The trait is synchronous and object-safe.
///
/// # Absence Semantics
///
/// [`pull`](GenePool::pull) returns `None` for unknown signatures. That is not
/// an error: the record may never have been pushed.
pub trait GenePool {
    /// Store a batch of records. Fire and forget; later pushes of the same
    /// signature replace earlier ones.
    fn push(&mut self, records: &[GcRecord]);

    /// Fetch the record with `signature`.
    fn pull(&self, signature: &Signature) -> Option<GcRecord>;

    /// Check existence without decoding.
    fn contains(&self, signature: &Signature) -> bool;
}

/// In-memory gene pool holding CBOR-encoded records.
#[derive(Debug, Default)]
pub struct MemoryGenePool {
    records: HashMap<Signature, Arc<[u8]>>,
    byte_count: usize,
    pushes: usize,
}

impl MemoryGenePool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total encoded bytes stored.
    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    /// Number of `push` calls received.
    pub fn push_count(&self) -> usize {
        self.pushes
    }

    /// Signatures in ascending order.
    pub fn signatures(&self) -> Vec<Signature> {
        let mut sigs: Vec<Signature> = self.records.keys().copied().collect();
        sigs.sort_unstable();
        sigs
    }
}

impl GenePool for MemoryGenePool {
    fn push(&mut self, records: &[GcRecord]) {
        self.pushes += 1;
        for record in records {
            let Some(signature) = record.signature else {
                warn!("gene pool push skipped a record without a signature");
                continue;
            };
            match encode_record(record) {
                Ok(bytes) => {
                    self.byte_count += bytes.len();
                    if let Some(old) = self.records.insert(signature, Arc::from(bytes)) {
                        self.byte_count -= old.len();
                    }
                }
                Err(err) => {
                    let signature = signature.short();
                    warn!(%err, %signature, "gene pool push failed");
                }
            }
        }
    }

    fn pull(&self, signature: &Signature) -> Option<GcRecord> {
        let bytes = self.records.get(signature)?;
        match decode_record(bytes) {
            Ok(record) => Some(record),
            Err(err) => {
                let signature = signature.short();
                warn!(%err, %signature, "gene pool holds an undecodable record");
                None
            }
        }
    }

    fn contains(&self, signature: &Signature) -> bool {
        self.records.contains_key(signature)
    }
}
