// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Genetic code graphs and the fixed-capacity Genetic Code Cache.
//!
//! A genetic code (GC) is a program fragment: a [`Graph`] wiring typed
//! endpoints across rows I, C, A, B, F, O, P and U, plus up to two
//! sub-graphs (GCA, GCB) that are themselves genetic codes. A population of
//! GCs forms a DAG that the [`GeneticCodeCache`] stores in parallel columns
//! indexed by [`GcHandle`].
//!
//! # Identity
//!
//! Every GC has a 32-byte BLAKE3 [`Signature`]. Codons (no sub-graphs) carry
//! an assigned signature; any other GC derives its signature from its
//! sub-graph signatures and its graph content, so structurally identical GCs
//! share one signature.
//!
//! # Eviction
//!
//! When the cache is full, the least recently used slots are purged. Entries
//! that referenced a purged slot freeze their signature and generation into
//! leaf data and keep working. Dirty entries are pushed to a [`GenePool`]
//! first so nothing modified is lost.
//!
//! # Threading
//!
//! The cache is single-threaded. Reads stamp a recency clock through interior
//! mutability, so `GeneticCodeCache` is neither `Sync` nor meant to be shared.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod cache;
mod config;
mod connection_spec;
mod connections;
pub mod ep_type;
mod error;
mod genetic_code;
mod graph;
mod ident;
mod interface;
mod properties;
mod record;
pub mod reference;
mod row;
mod rows;
mod store;
pub mod wiring;

pub use cache::{GcParts, GeneticCodeCache, OptimizeReport, PurgeReport};
pub use config::{CacheConfig, RandomGraphConfig, DEFAULT_CAPACITY, DEFAULT_PURGE_FRACTION};
pub use connection_spec::{ConnectionSpec, Constant, SourceRef};
pub use connections::{Connection, ConnectionTable};
pub use ep_type::EndPointType;
pub use error::{CacheError, CodecError, GraphError, ReferenceError};
pub use genetic_code::{DependencyField, GcHandle, GcRef, GeneticCode, Usage};
pub use graph::Graph;
pub use ident::{make_gc_signature, random_signature, Hash, Signature, NULL_SIGNATURE};
pub use interface::{empty_interface, Interface, MAX_ENDPOINTS};
pub use properties::Properties;
pub use record::{decode_record, encode_record, GcRecord};
pub use row::{
    base_sources, valid_sources, EndPointClass, Row, ALL_ROWS, DESTINATION_ROWS, SOURCE_ROWS,
};
pub use rows::{slot_of, RowSet, ROW_SET_SLOTS};
pub use store::{GenePool, MemoryGenePool};
pub use wiring::{random_wiring, Endpoint, EndpointKey, EndpointRef, Finding, FindingCode, Wiring};
