// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Least-recently-used eviction.

use rustc_hash::FxHashSet;
use tracing::{debug, info, instrument, warn};

use super::{handle_at, GeneticCodeCache, LeafData, SlotState};
use crate::genetic_code::{DependencyField, GcHandle, GcRef};

/// Outcome of one purge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Slots returned to the free list, least recently used first.
    pub freed: Vec<GcHandle>,
    /// Dirty entries pushed to the gene pool.
    pub flushed: usize,
    /// Entries that lost a dependency and now hold leaf data.
    pub leafified: usize,
    /// Surviving entries whose only referrers were purged.
    pub orphans: Vec<GcHandle>,
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn candidate_count(capacity: usize, fraction: f64) -> usize {
    (capacity as f64 * fraction).floor() as usize
}

impl GeneticCodeCache {
    /// Evict the `floor(capacity * fraction)` least recently used slots.
    ///
    /// Reserved and free slots among them are skipped, so fewer slots may be
    /// freed. Every survivor that referenced an evicted entry first freezes
    /// its signature and generation into leaf data. Dirty entries are pushed
    /// to the gene pool before any slot is reclaimed.
    #[instrument(skip_all, fields(fraction = fraction))]
    pub fn purge(&mut self, fraction: f64) -> PurgeReport {
        self.purges += 1;
        let candidates = self.purge_candidates(candidate_count(self.capacity(), fraction));
        if candidates.is_empty() {
            warn!(capacity = self.capacity(), "purge found no candidates");
            return PurgeReport::default();
        }
        let evicted: FxHashSet<GcHandle> = candidates.iter().copied().collect();

        let occupied: Vec<GcHandle> = self.occupied_slots().collect();
        let leafified = occupied
            .iter()
            .filter(|h| !self.make_leaf(**h, &evicted).is_empty())
            .count();

        let orphans = self.orphans(&candidates, &evicted, &occupied);
        if !orphans.is_empty() {
            debug!(?orphans, "purge left unreferenced survivors");
        }

        let flushed = self.flush();
        // Reverse so the free list hands out the oldest slot first.
        for &h in candidates.iter().rev() {
            self.reclaim(h);
        }

        info!(
            freed = candidates.len(),
            flushed,
            leafified,
            orphans = orphans.len(),
            "purge"
        );
        PurgeReport {
            freed: candidates,
            flushed,
            leafified,
            orphans,
        }
    }

    /// The `k` oldest slots by access stamp, minus any that are not resident.
    /// Ties keep slot order.
    fn purge_candidates(&self, k: usize) -> Vec<GcHandle> {
        let mut order: Vec<usize> = (0..self.capacity()).collect();
        order.sort_by_key(|&i| self.access_sequence[i].get());
        order
            .into_iter()
            .take(k)
            .filter(|&i| self.state[i] == SlotState::Resident)
            .map(handle_at)
            .collect()
    }

    /// Freeze `handle` and replace each dependency in `evicted` with
    /// [`GcRef::Purged`]. Returns the evicted dependencies found.
    ///
    /// Idempotent: an entry that is already a leaf keeps its frozen signature
    /// and generation.
    pub(crate) fn make_leaf(
        &mut self,
        handle: GcHandle,
        evicted: &FxHashSet<GcHandle>,
    ) -> Vec<GcHandle> {
        let hit: Vec<(DependencyField, GcHandle)> = DependencyField::ALL
            .into_iter()
            .filter_map(|f| match self.dependency_at(handle, f) {
                GcRef::Resident(dep) if evicted.contains(&dep) => Some((f, dep)),
                _ => None,
            })
            .collect();
        if hit.is_empty() {
            return Vec::new();
        }

        let signature = self.signature_at(handle);
        let generation = self.generation_at(handle);
        let frozen = self.leaf(handle).map(|leaf| leaf.dependencies);
        let mut dependencies = frozen.unwrap_or([None; 4]);
        for field in DependencyField::ALL {
            if let GcRef::Resident(dep) = self.dependency_at(handle, field) {
                dependencies[field.index()] = Some(self.signature_at(dep));
            }
        }
        self.attach_leaf(
            handle,
            LeafData {
                owner: handle,
                signature,
                generation,
                dependencies,
            },
        );

        for (field, _) in &hit {
            self.dependencies[field.index()][handle.index()] = GcRef::Purged;
        }
        debug!(handle = %handle, purged = hit.len(), "leaf conversion");
        hit.into_iter().map(|(_, dep)| dep).collect()
    }

    /// Survivors that a candidate depended on and no survivor references.
    fn orphans(
        &self,
        candidates: &[GcHandle],
        evicted: &FxHashSet<GcHandle>,
        occupied: &[GcHandle],
    ) -> Vec<GcHandle> {
        let referenced: FxHashSet<GcHandle> = occupied
            .iter()
            .filter(|h| !evicted.contains(h))
            .flat_map(|h| DependencyField::ALL.map(|f| self.dependency_at(*h, f)))
            .filter_map(GcRef::handle)
            .collect();
        let mut orphans: Vec<GcHandle> = candidates
            .iter()
            .flat_map(|h| DependencyField::ALL.map(|f| self.dependency_at(*h, f)))
            .filter_map(GcRef::handle)
            .filter(|dep| !evicted.contains(dep) && !referenced.contains(dep))
            .collect();
        orphans.sort_unstable();
        orphans.dedup();
        orphans
    }
}
