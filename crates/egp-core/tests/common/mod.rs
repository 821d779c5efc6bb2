// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use egp_core::{CacheConfig, ConnectionSpec, GcRecord, GeneticCodeCache, Signature};
use proptest::test_runner::{Config as PropConfig, RngAlgorithm, TestRng, TestRunner};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Graph exercising rows I, C, A, B, O and U.
pub const TEST_GRAPH: &str = r#"{
    "A": [["I", 0, 2], ["C", 0, 2]],
    "B": [["I", 1, 2], ["A", 0, 2]],
    "O": [["B", 0, 2], ["A", 1, 2]],
    "U": [["I", 2, 2]],
    "C": [["42", 2]]
}"#;

/// Minimal codon graph: one int passed straight through.
pub const CODON_GRAPH: &str = r#"{"O": [["I", 0, 2]]}"#;

pub fn spec(json: &str) -> ConnectionSpec {
    serde_json::from_str(json).expect("fixture graph parses")
}

/// Signature with `n` in its first four bytes; never null for `n > 0`.
pub fn sig(n: u32) -> Signature {
    let mut bytes = [0xa5_u8; 32];
    bytes[..4].copy_from_slice(&n.to_le_bytes());
    Signature(bytes)
}

/// Codon record with a unique signature.
pub fn codon(n: u32) -> GcRecord {
    let mut record = GcRecord::from_graph(spec(CODON_GRAPH));
    record.signature = Some(sig(n));
    record
}

/// Non-codon record over `TEST_GRAPH` naming its sub-graphs by signature.
pub fn parent(gca: Signature, gcb: Signature) -> GcRecord {
    let mut record = GcRecord::from_graph(spec(TEST_GRAPH));
    record.gca = Some(gca);
    record.gcb = Some(gcb);
    record
}

pub fn cache(capacity: usize) -> GeneticCodeCache {
    let config = CacheConfig::with_capacity(capacity);
    GeneticCodeCache::new(config).expect("valid cache config")
}

/// Property runner with a fixed ChaCha seed that starts with `tag`.
pub fn pinned_runner(tag: &[u8]) -> TestRunner {
    let mut seed = [0_u8; 32];
    let len = tag.len().min(seed.len());
    seed[..len].copy_from_slice(&tag[..len]);
    let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &seed);
    TestRunner::new_with_rng(PropConfig::default(), rng)
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
