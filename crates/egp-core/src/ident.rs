// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Genetic code signatures.
use blake3::Hasher;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::graph::Graph;

/// Canonical 256-bit hash.
pub type Hash = [u8; 32];

/// Content signature of a genetic code.
///
/// Non-codon signatures are `blake3("gc:" || gca || gcb || graph content)`
/// (see [`make_gc_signature`]). Codon signatures are assigned externally (or
/// at random for generated codons) and stored verbatim. The all-zero value is
/// [`NULL_SIGNATURE`], used for absent dependencies.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Signature(pub Hash);

/// Signature of "no genetic code".
pub const NULL_SIGNATURE: Signature = Signature([0; 32]);

impl Signature {
    /// Returns the canonical byte representation of this signature.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Returns `true` for [`NULL_SIGNATURE`].
    pub fn is_null(&self) -> bool {
        self.0 == [0; 32]
    }

    /// First eight bytes as hex, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({})", self.short())
    }
}

/// Produces a domain-separated genetic code signature (prefix `b"gc:"`) using BLAKE3.
pub fn make_gc_signature(gca: &Signature, gcb: &Signature, graph: &Graph) -> Signature {
    let mut hasher = Hasher::new();
    hasher.update(b"gc:");
    hasher.update(gca.as_bytes());
    hasher.update(gcb.as_bytes());
    graph.hash_content(&mut hasher);
    Signature(hasher.finalize().into())
}

/// Random, never-null signature for a generated codon.
pub fn random_signature<R: Rng + ?Sized>(rng: &mut R) -> Signature {
    loop {
        let mut bytes = [0_u8; 32];
        rng.fill(&mut bytes);
        let sig = Signature(bytes);
        if !sig.is_null() {
            return sig;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::connection_spec::ConnectionSpec;
    use crate::ep_type::INT;
    use crate::row::Row;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn graph(value: &str) -> Graph {
        let spec = ConnectionSpec::from_parts(&[(Row::O, &[(Row::C, 0, INT)])], &[(value, INT)]);
        Graph::from_spec(&spec).unwrap()
    }

    #[test]
    fn signature_depends_on_every_input() {
        let a = random_signature(&mut StdRng::seed_from_u64(1));
        let base = make_gc_signature(&a, &NULL_SIGNATURE, &graph("1"));
        assert_eq!(base, make_gc_signature(&a, &NULL_SIGNATURE, &graph("1")));
        assert_ne!(base, make_gc_signature(&NULL_SIGNATURE, &a, &graph("1")));
        assert_ne!(base, make_gc_signature(&a, &NULL_SIGNATURE, &graph("2")));
        assert!(!base.is_null());
    }

    #[test]
    fn display_is_full_hex_and_short_is_prefix() {
        let sig = Signature([0xab; 32]);
        assert_eq!(sig.to_string().len(), 64);
        assert_eq!(sig.short(), "abababababababab");
        assert!(NULL_SIGNATURE.is_null());
    }
}
