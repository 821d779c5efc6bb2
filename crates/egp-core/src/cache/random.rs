// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Random genetic code trees.

use rand::Rng;
use tracing::{debug, instrument};

use super::{GeneticCodeCache, LeafData};
use crate::error::CacheError;
use crate::genetic_code::{GcHandle, GcRef, Usage};
use crate::graph::Graph;
use crate::ident::random_signature;
use crate::interface::Interface;
use crate::properties::Properties;
use crate::row::Row;
use crate::wiring::{random_wiring, random_wiring_around, Endpoint};

const CODON_ROWS: [Row; 3] = [Row::I, Row::C, Row::O];
const PARENT_ROWS: [Row; 5] = [Row::I, Row::C, Row::A, Row::B, Row::O];

/// Endpoints a parent must expose to wire in child `row` with `inputs` and
/// `outputs`.
fn child_endpoints(row: Row, inputs: &Interface, outputs: &Interface) -> Vec<Endpoint> {
    let dst = (0..=u8::MAX)
        .zip(inputs.types())
        .map(|(idx, &ty)| Endpoint::dst(row, idx, ty));
    let src = (0..=u8::MAX)
        .zip(outputs.types())
        .map(|(idx, &ty)| Endpoint::src(row, idx, ty));
    dst.chain(src).collect()
}

impl GeneticCodeCache {
    /// Build a full binary tree of random genetic codes `depth` levels deep
    /// and return its root.
    ///
    /// Depth 0 is a single codon with a random signature. The root takes its
    /// slot first; children are pinned until their parent is complete. Every
    /// new entry is dirty. A tree of depth `d` adds `2^(d+1) - 1` entries.
    ///
    /// # Errors
    ///
    /// [`CacheError::CapacityExhausted`] if a slot cannot be found. Slots
    /// reserved for the unfinished part of the tree are released.
    #[instrument(skip_all, fields(depth = depth))]
    pub fn random<R: Rng + ?Sized>(
        &mut self,
        depth: u32,
        rng: &mut R,
    ) -> Result<GcHandle, CacheError> {
        let root = self.random_node(depth, rng)?;
        self.release(root);
        Ok(root)
    }

    fn random_node<R: Rng + ?Sized>(
        &mut self,
        depth: u32,
        rng: &mut R,
    ) -> Result<GcHandle, CacheError> {
        let slot = self.assign_index()?;
        let built = if depth == 0 {
            self.random_codon(slot, rng)
        } else {
            self.random_parent(slot, depth, rng)
        };
        if let Err(err) = built {
            self.reclaim(slot);
            return Err(err);
        }
        self.dirty[slot.index()] = true;
        Ok(slot)
    }

    fn random_codon<R: Rng + ?Sized>(
        &mut self,
        slot: GcHandle,
        rng: &mut R,
    ) -> Result<(), CacheError> {
        let wiring = random_wiring(&CODON_ROWS, &self.config.random, rng);
        let graph = Graph::from_spec(&wiring.to_spec()?)?;
        let deps = [GcRef::Empty; 4];
        self.fill(slot, deps, graph, Properties::default(), Usage::default());
        let signature = random_signature(rng);
        self.attach_leaf(
            slot,
            LeafData {
                owner: slot,
                signature,
                generation: 0,
                dependencies: [None; 4],
            },
        );
        Ok(())
    }

    fn random_parent<R: Rng + ?Sized>(
        &mut self,
        slot: GcHandle,
        depth: u32,
        rng: &mut R,
    ) -> Result<(), CacheError> {
        let gca = self.random_node(depth - 1, rng)?;
        let gcb = match self.random_node(depth - 1, rng) {
            Ok(gcb) => gcb,
            Err(err) => {
                self.reclaim(gca);
                return Err(err);
            }
        };

        let (a, b) = (self.graph_at(gca), self.graph_at(gcb));
        let mut fixed = child_endpoints(Row::A, a.inputs(), a.outputs());
        fixed.extend(child_endpoints(Row::B, b.inputs(), b.outputs()));
        let wiring = random_wiring_around(&PARENT_ROWS, fixed, &self.config.random, rng);
        let graph = match wiring.to_spec().and_then(|spec| Graph::from_spec(&spec)) {
            Ok(graph) => graph,
            Err(err) => {
                self.reclaim(gca);
                self.reclaim(gcb);
                return Err(err.into());
            }
        };

        let deps = [
            GcRef::Resident(gca),
            GcRef::Resident(gcb),
            GcRef::Empty,
            GcRef::Empty,
        ];
        self.fill(slot, deps, graph, Properties::default(), Usage::default());
        self.release(gca);
        self.release(gcb);
        debug!(%slot, %gca, %gcb, depth, "random parent");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::row::EndPointClass;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cache(capacity: usize) -> GeneticCodeCache {
        let config = CacheConfig::with_capacity(capacity);
        GeneticCodeCache::new(config).unwrap()
    }

    #[test]
    fn random_codon_is_a_dirty_leaf() {
        let mut cache = cache(4);
        let h = cache.random(0, &mut StdRng::seed_from_u64(1)).unwrap();
        let view = cache.get(h).unwrap();
        assert!(view.is_codon());
        assert!(view.is_leaf());
        assert!(view.is_dirty());
        assert_eq!(view.generation(), 0);
    }

    #[test]
    fn random_tree_wires_children_interfaces() {
        let mut cache = cache(16);
        let root = cache.random(2, &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(root, GcHandle(0));
        assert_eq!(cache.len(), 7);
        let view = cache.get(root).unwrap();
        assert_eq!(view.generation(), 2);
        let gca = view.gca().handle().unwrap();
        let a = cache.graph_at(gca);
        let parent = cache.graph_at(root);
        assert_eq!(parent.rows().get(Row::A, EndPointClass::Dst), a.inputs());
        assert!(cache.check_consistency().is_empty());
    }

    #[test]
    fn too_small_cache_releases_reserved_slots() {
        let mut cache = cache(2);
        let err = cache.random(1, &mut StdRng::seed_from_u64(3)).unwrap_err();
        assert_eq!(err, CacheError::CapacityExhausted { capacity: 2 });
        assert!(cache.is_empty());
        assert!(cache.check_consistency().is_empty());
    }
}
