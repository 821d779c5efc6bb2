// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types.

use crate::genetic_code::GcHandle;
use crate::row::Row;

/// Malformed graph or connection specification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// An interface or row would exceed 256 endpoints.
    #[error("[GRAPH_TOO_MANY_ENDPOINTS] {len} endpoints exceeds the limit of 256")]
    TooManyEndpoints {
        /// Offending length.
        len: usize,
    },
    /// A row used as a destination cannot hold destination endpoints.
    #[error("[GRAPH_NOT_A_DESTINATION] row {0} cannot hold destination endpoints")]
    NotADestination(Row),
    /// A connection names a source row that cannot hold source endpoints.
    #[error("[GRAPH_NOT_A_SOURCE] row {0} cannot hold source endpoints")]
    NotASource(Row),
    /// A constant reference points past the end of row C.
    #[error("[GRAPH_CONSTANT_OUT_OF_RANGE] C{idx} does not exist ({len} constants)")]
    ConstantOutOfRange {
        /// Referenced index.
        idx: u8,
        /// Number of constants defined.
        len: usize,
    },
    /// Destination indices within a row are not contiguous from zero.
    #[error("[GRAPH_NON_CONTIGUOUS] row {row} index {idx} breaks contiguity")]
    NonContiguous {
        /// Row with the gap.
        row: Row,
        /// First out-of-sequence index.
        idx: u8,
    },
    /// A destination endpoint has no source so the graph cannot be expressed
    /// as a connection specification.
    #[error("[GRAPH_UNCONNECTED] destination {row}{idx} is not connected")]
    Unconnected {
        /// Row of the destination endpoint.
        row: Row,
        /// Index of the destination endpoint.
        idx: u8,
    },
    /// A JSON graph entry could not be interpreted.
    #[error("[GRAPH_BAD_ENTRY] {0}")]
    BadEntry(String),
}

/// Errors raised by the genetic code cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Purge freed no slot and a new entry is still needed.
    #[error("[GCC_CAPACITY_EXHAUSTED] no free slot after purge (capacity {capacity})")]
    CapacityExhausted {
        /// Configured capacity.
        capacity: usize,
    },
    /// A dependency field was given a handle that is not a resident entry.
    #[error("[GCC_INVALID_REFERENCE] {handle} is not a resident genetic code")]
    InvalidReference {
        /// The rejected handle.
        handle: GcHandle,
    },
    /// A slot still referenced by another entry cannot be removed directly.
    #[error("[GCC_STILL_REFERENCED] {handle} is referenced by {by}")]
    StillReferenced {
        /// The slot that was to be removed.
        handle: GcHandle,
        /// One referencing entry.
        by: GcHandle,
    },
    /// Configuration rejected.
    #[error("[GCC_INVALID_CONFIG] {0}")]
    InvalidConfig(String),
    /// The graph of a new entry is malformed.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Reference allocation failed.
    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

/// Errors from reference construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    /// The intra-sub-process counter ran past 32 bits.
    #[error("[REF_ISPUID_OVERFLOW] intra-sub-process id space exhausted")]
    IspuidOverflow,
    /// Requested bit window lies outside the signature.
    #[error("[REF_INVALID_SHIFT] shift {0} is outside 0..=192")]
    InvalidShift(u32),
}

/// Record encode/decode failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// CBOR serialisation failed.
    #[error("[CODEC_ENCODE] {0}")]
    Encode(String),
    /// CBOR deserialisation failed.
    #[error("[CODEC_DECODE] {0}")]
    Decode(String),
}
