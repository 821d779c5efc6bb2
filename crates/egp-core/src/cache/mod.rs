// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The Genetic Code Cache.
//!
//! A fixed-capacity arena with one column per attribute, all indexed by
//! [`GcHandle`]. Read-mostly columns (dependencies, graphs, properties) are
//! kept apart from the volatile ones (usage, recency, dirty bits) so that a
//! forked copy of the process only has to copy the pages it actually writes.
//!
//! # Slot lifecycle
//!
//! | State | Meaning |
//! |---|---|
//! | Free | unused, on the free list or beyond the bump pointer |
//! | Reserved | assigned and under construction; pinned against purge |
//! | Resident | a complete genetic code |
//!
//! A resident entry may also be a *leaf*: it owns a dynamic-store record with
//! its frozen signature, generation and the signatures of its dependencies.
//! Codons are leaves from birth because their signature is data, not derived.
//! Other entries become leaves when a dependency is purged; the dependency
//! field then reads [`GcRef::Purged`].
//!
//! # Invariants
//!
//! - No occupied slot holds [`GcRef::Resident`] pointing at a free slot.
//! - Every [`GcRef::Purged`] field belongs to an entry with leaf data naming
//!   the purged dependency's signature.
//! - Free slots have `access_sequence == u64::MAX`.

mod optimize;
mod purge;
mod random;

pub use optimize::OptimizeReport;
pub use purge::PurgeReport;

use std::cell::Cell;
use std::fmt;

use rustc_hash::FxHashMap;
use tracing::{info, instrument};

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::genetic_code::{DependencyField, GcHandle, GcRef, GeneticCode, Usage};
use crate::graph::Graph;
use crate::ident::{make_gc_signature, Signature, NULL_SIGNATURE};
use crate::properties::Properties;
use crate::record::GcRecord;
use crate::reference::{reference, RefCounter};
use crate::store::{GenePool, MemoryGenePool};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum SlotState {
    Free,
    Reserved,
    Resident,
}

/// Frozen summary of a leaf entry.
#[derive(Clone, Debug)]
struct LeafData {
    owner: GcHandle,
    signature: Signature,
    generation: u64,
    dependencies: [Option<Signature>; 4],
}

/// Auxiliary storage for leaf data, addressed by the per-slot `ds_index`.
///
/// A slot owns at most one record, so live records never outnumber slots and
/// every index fits in `u32` like a slot index does.
#[derive(Debug, Default)]
struct DynamicStore {
    entries: Vec<Option<LeafData>>,
    free: Vec<u32>,
}

impl DynamicStore {
    #[allow(clippy::cast_possible_truncation)]
    fn alloc(&mut self, data: LeafData) -> u32 {
        if let Some(idx) = self.free.pop() {
            self.entries[idx as usize] = Some(data);
            return idx;
        }
        debug_assert!(u32::try_from(self.entries.len()).is_ok());
        self.entries.push(Some(data));
        (self.entries.len() - 1) as u32
    }

    fn release(&mut self, idx: u32) {
        if let Some(entry) = self.entries.get_mut(idx as usize) {
            if entry.take().is_some() {
                self.free.push(idx);
            }
        }
    }

    fn get(&self, idx: u32) -> Option<&LeafData> {
        self.entries.get(idx as usize).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, idx: u32) -> Option<&mut LeafData> {
        self.entries.get_mut(idx as usize).and_then(Option::as_mut)
    }

    fn live(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }
}

/// Parts of a genetic code built by an operator around resident children.
#[derive(Debug, Clone, Default)]
pub struct GcParts {
    /// Sub-graph A.
    pub gca: Option<GcHandle>,
    /// Sub-graph B.
    pub gcb: Option<GcHandle>,
    /// First ancestor.
    pub ancestor_a: Option<GcHandle>,
    /// Second ancestor.
    pub ancestor_b: Option<GcHandle>,
    /// Wiring.
    pub graph: Graph,
    /// Property flags.
    pub properties: Properties,
    /// Signature for a codon. Ignored when either sub-graph is set.
    pub signature: Option<Signature>,
}

impl GcParts {
    fn dependencies(&self) -> [Option<GcHandle>; 4] {
        [self.gca, self.gcb, self.ancestor_a, self.ancestor_b]
    }
}

/// Fixed-capacity, column-oriented store of genetic codes.
///
/// Single-threaded: reads update the recency clock through interior
/// mutability, so the cache is neither `Sync` nor shared between threads.
pub struct GeneticCodeCache {
    config: CacheConfig,
    pool: Box<dyn GenePool>,

    dependencies: [Vec<GcRef>; 4],
    graph: Vec<Graph>,
    properties: Vec<Properties>,
    signature: Vec<Cell<Option<Signature>>>,
    generation: Vec<Cell<Option<u64>>>,
    ds_index: Vec<Option<u32>>,
    reference: Vec<Option<i64>>,
    state: Vec<SlotState>,

    usage: Vec<Usage>,
    access_sequence: Vec<Cell<u64>>,
    dirty: Vec<bool>,

    clock: Cell<u64>,
    free: Vec<u32>,
    next_virgin: usize,
    occupied: usize,
    purges: u64,
    ds: DynamicStore,
    refs: RefCounter,
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
const fn handle_at(slot: usize) -> GcHandle {
    // Capacity is validated to fit in u32.
    GcHandle(slot as u32)
}

impl GeneticCodeCache {
    /// Create a cache backed by an in-memory gene pool.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        Self::with_pool(config, Box::new(MemoryGenePool::new()))
    }

    /// Create a cache that flushes to `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfig`] if `config` fails validation.
    pub fn with_pool(config: CacheConfig, pool: Box<dyn GenePool>) -> Result<Self, CacheError> {
        config.validate()?;
        let capacity = config.capacity;
        Ok(Self {
            config,
            pool,
            dependencies: std::array::from_fn(|_| vec![GcRef::Empty; capacity]),
            graph: vec![Graph::default(); capacity],
            properties: vec![Properties::default(); capacity],
            signature: (0..capacity).map(|_| Cell::new(None)).collect(),
            generation: (0..capacity).map(|_| Cell::new(None)).collect(),
            ds_index: vec![None; capacity],
            reference: vec![None; capacity],
            state: vec![SlotState::Free; capacity],
            usage: vec![Usage::default(); capacity],
            access_sequence: (0..capacity).map(|_| Cell::new(u64::MAX)).collect(),
            dirty: vec![false; capacity],
            clock: Cell::new(0),
            free: Vec::new(),
            next_virgin: 0,
            occupied: 0,
            purges: 0,
            ds: DynamicStore::default(),
            refs: RefCounter::new(),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// Returns `true` if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// The gene pool dirty entries are flushed to.
    pub fn pool(&self) -> &dyn GenePool {
        self.pool.as_ref()
    }

    /// Number of purges run so far.
    pub fn purge_count(&self) -> u64 {
        self.purges
    }

    // ── Slot management ─────────────────────────────────────────────────

    fn take_slot(&mut self) -> Option<GcHandle> {
        let handle = if let Some(slot) = self.free.pop() {
            GcHandle(slot)
        } else if self.next_virgin < self.capacity() {
            self.next_virgin += 1;
            handle_at(self.next_virgin - 1)
        } else {
            return None;
        };
        self.state[handle.index()] = SlotState::Reserved;
        self.occupied += 1;
        self.touch(handle);
        Some(handle)
    }

    /// Allocate a slot, purging once if the cache is full.
    ///
    /// The slot comes back reserved: it is pinned against purge until the
    /// caller finishes filling it.
    pub(crate) fn assign_index(&mut self) -> Result<GcHandle, CacheError> {
        if let Some(handle) = self.take_slot() {
            return Ok(handle);
        }
        self.purge(self.config.purge_fraction);
        self.take_slot().ok_or(CacheError::CapacityExhausted {
            capacity: self.capacity(),
        })
    }

    fn release(&mut self, handle: GcHandle) {
        if self.state[handle.index()] == SlotState::Reserved {
            self.state[handle.index()] = SlotState::Resident;
        }
    }

    fn pin(&mut self, handle: GcHandle) -> bool {
        if self.state[handle.index()] == SlotState::Resident {
            self.state[handle.index()] = SlotState::Reserved;
            return true;
        }
        false
    }

    /// Return a slot to the free list, discarding its contents.
    fn reclaim(&mut self, handle: GcHandle) {
        let i = handle.index();
        for column in &mut self.dependencies {
            column[i] = GcRef::Empty;
        }
        self.graph[i] = Graph::default();
        self.properties[i] = Properties::default();
        self.signature[i].set(None);
        self.generation[i].set(None);
        if let Some(ds) = self.ds_index[i].take() {
            self.ds.release(ds);
        }
        self.reference[i] = None;
        self.usage[i] = Usage::default();
        self.access_sequence[i].set(u64::MAX);
        self.dirty[i] = false;
        if self.state[i] != SlotState::Free {
            self.state[i] = SlotState::Free;
            self.occupied -= 1;
            self.free.push(handle.0);
        }
    }

    fn fill(
        &mut self,
        handle: GcHandle,
        deps: [GcRef; 4],
        graph: Graph,
        properties: Properties,
        usage: Usage,
    ) {
        let i = handle.index();
        for (column, dep) in self.dependencies.iter_mut().zip(deps) {
            column[i] = dep;
        }
        self.graph[i] = graph;
        self.properties[i] = properties;
        self.usage[i] = usage;
    }

    fn attach_leaf(&mut self, handle: GcHandle, data: LeafData) {
        let i = handle.index();
        self.signature[i].set(Some(data.signature));
        self.generation[i].set(Some(data.generation));
        match self.ds_index[i].and_then(|ds| self.ds.get_mut(ds)) {
            Some(existing) => *existing = data,
            None => self.ds_index[i] = Some(self.ds.alloc(data)),
        }
    }

    fn leaf(&self, handle: GcHandle) -> Option<&LeafData> {
        self.ds_index[handle.index()].and_then(|ds| self.ds.get(ds))
    }

    fn occupied_slots(&self) -> impl Iterator<Item = GcHandle> + '_ {
        self.state
            .iter()
            .enumerate()
            .filter(|(_, s)| **s != SlotState::Free)
            .map(|(i, _)| handle_at(i))
    }

    fn is_occupied(&self, handle: GcHandle) -> bool {
        matches!(
            self.state.get(handle.index()),
            Some(SlotState::Reserved | SlotState::Resident)
        )
    }

    fn is_resident(&self, handle: GcHandle) -> bool {
        self.state.get(handle.index()) == Some(&SlotState::Resident)
    }

    fn check_resident(&self, handle: GcHandle) -> Result<(), CacheError> {
        if self.is_resident(handle) {
            Ok(())
        } else {
            Err(CacheError::InvalidReference { handle })
        }
    }

    // ── Recency ─────────────────────────────────────────────────────────

    /// Mark `handle` as used now.
    ///
    /// O(1) and allocation free. Free slots are ignored so they keep sorting
    /// last in purge selection.
    #[inline]
    pub fn touch(&self, handle: GcHandle) {
        let i = handle.index();
        if self.state.get(i).is_some_and(|s| *s != SlotState::Free) {
            let now = self.clock.get() + 1;
            self.clock.set(now);
            self.access_sequence[i].set(now);
        }
    }

    /// Recency stamp of a slot; `u64::MAX` for free slots.
    pub fn access_sequence(&self, handle: GcHandle) -> Option<u64> {
        self.access_sequence.get(handle.index()).map(Cell::get)
    }

    // ── Column reads (no touch) ─────────────────────────────────────────

    pub(crate) fn dependency_at(&self, handle: GcHandle, field: DependencyField) -> GcRef {
        self.dependencies[field.index()][handle.index()]
    }

    pub(crate) fn graph_at(&self, handle: GcHandle) -> &Graph {
        &self.graph[handle.index()]
    }

    pub(crate) fn properties_at(&self, handle: GcHandle) -> Properties {
        self.properties[handle.index()]
    }

    pub(crate) fn usage_at(&self, handle: GcHandle) -> Usage {
        self.usage[handle.index()]
    }

    /// Signature of a dependency; [`NULL_SIGNATURE`] for an empty field.
    fn dependency_signature(&self, handle: GcHandle, field: DependencyField) -> Signature {
        match self.dependency_at(handle, field) {
            GcRef::Resident(dep) => self.signature_at(dep),
            GcRef::Empty => NULL_SIGNATURE,
            GcRef::Purged => self
                .leaf(handle)
                .and_then(|leaf| leaf.dependencies[field.index()])
                .unwrap_or(NULL_SIGNATURE),
        }
    }

    pub(crate) fn signature_at(&self, handle: GcHandle) -> Signature {
        let memo = &self.signature[handle.index()];
        if let Some(sig) = memo.get() {
            return sig;
        }
        let sig = match self.leaf(handle) {
            Some(leaf) => leaf.signature,
            None => make_gc_signature(
                &self.dependency_signature(handle, DependencyField::Gca),
                &self.dependency_signature(handle, DependencyField::Gcb),
                self.graph_at(handle),
            ),
        };
        memo.set(Some(sig));
        sig
    }

    pub(crate) fn generation_at(&self, handle: GcHandle) -> u64 {
        let memo = &self.generation[handle.index()];
        if let Some(generation) = memo.get() {
            return generation;
        }
        let generation = if let Some(leaf) = self.leaf(handle) {
            leaf.generation
        } else {
            let child = |field| match self.dependency_at(handle, field) {
                GcRef::Resident(dep) => Some(self.generation_at(dep)),
                GcRef::Empty | GcRef::Purged => None,
            };
            match (child(DependencyField::Gca), child(DependencyField::Gcb)) {
                (None, None) => 0,
                (a, b) => a.unwrap_or(0).max(b.unwrap_or(0)) + 1,
            }
        };
        memo.set(Some(generation));
        generation
    }

    pub(crate) fn record_at(&self, handle: GcHandle) -> GcRecord {
        let dep = |field| {
            let sig = self.dependency_signature(handle, field);
            (!sig.is_null()).then_some(sig)
        };
        GcRecord {
            signature: Some(self.signature_at(handle)),
            gca: dep(DependencyField::Gca),
            gcb: dep(DependencyField::Gcb),
            ancestor_a: dep(DependencyField::AncestorA),
            ancestor_b: dep(DependencyField::AncestorB),
            graph: self.graph_at(handle).to_spec(),
            generation: self.generation_at(handle),
            usage: self.usage_at(handle),
            properties: self.properties_at(handle),
        }
    }

    /// Returns `true` if `handle` holds leaf data.
    pub fn is_leaf(&self, handle: GcHandle) -> bool {
        matches!(self.ds_index.get(handle.index()), Some(Some(_)))
    }

    /// Returns `true` if `handle` has changes not yet pushed to the gene pool.
    pub fn is_dirty(&self, handle: GcHandle) -> bool {
        self.dirty.get(handle.index()).copied().unwrap_or(false)
    }

    // ── Views and iteration ─────────────────────────────────────────────

    /// View of a resident entry.
    pub fn get(&self, handle: GcHandle) -> Option<GeneticCode<'_>> {
        self.is_resident(handle)
            .then(|| GeneticCode::new(self, handle))
    }

    /// Returns `true` if `handle` is a resident entry.
    pub fn contains(&self, handle: GcHandle) -> bool {
        self.is_resident(handle)
    }

    /// Resident entries in slot order.
    pub fn handles(&self) -> impl Iterator<Item = GcHandle> + '_ {
        self.state
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == SlotState::Resident)
            .map(|(i, _)| handle_at(i))
    }

    /// Views of the resident entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = GeneticCode<'_>> + '_ {
        self.handles().map(move |h| GeneticCode::new(self, h))
    }

    /// Resident entries holding leaf data.
    pub fn leaves(&self) -> impl Iterator<Item = GcHandle> + '_ {
        self.handles().filter(move |h| self.is_leaf(*h))
    }

    /// Signatures of the resident entries.
    pub fn signatures(&self) -> impl Iterator<Item = (GcHandle, Signature)> + '_ {
        self.handles().map(move |h| (h, self.signature_at(h)))
    }

    /// Declarative records of the resident entries.
    pub fn records(&self) -> impl Iterator<Item = GcRecord> + '_ {
        self.handles().map(move |h| self.record_at(h))
    }

    /// Resident entry with `signature`, if any. Linear scan.
    pub fn find(&self, signature: &Signature) -> Option<GcHandle> {
        self.handles().find(|h| self.signature_at(*h) == *signature)
    }

    fn signature_index(&self) -> FxHashMap<Signature, GcHandle> {
        self.signatures().map(|(h, s)| (s, h)).collect()
    }

    // ── Construction ────────────────────────────────────────────────────

    /// Insert one record, returning the existing entry if its signature is
    /// already resident.
    ///
    /// # Errors
    ///
    /// [`CacheError::Graph`] for a malformed graph and
    /// [`CacheError::CapacityExhausted`] if no slot can be found.
    pub fn insert(&mut self, record: GcRecord) -> Result<GcHandle, CacheError> {
        let mut index = self.signature_index();
        let (handle, _) = self.insert_indexed(record, &mut index)?;
        Ok(handle)
    }

    /// Bulk insert, skipping records whose signature is already resident.
    ///
    /// Returns the handles of the entries added, in input order.
    ///
    /// # Errors
    ///
    /// Stops at the first record that cannot be inserted; see [`insert`](Self::insert).
    #[instrument(skip_all)]
    pub fn update(
        &mut self,
        records: impl IntoIterator<Item = GcRecord>,
    ) -> Result<Vec<GcHandle>, CacheError> {
        let mut index = self.signature_index();
        let mut added = Vec::new();
        let mut skipped = 0_usize;
        for record in records {
            match self.insert_indexed(record, &mut index)? {
                (handle, true) => added.push(handle),
                (_, false) => skipped += 1,
            }
        }
        info!(added = added.len(), skipped, "cache update");
        Ok(added)
    }

    fn insert_indexed(
        &mut self,
        record: GcRecord,
        index: &mut FxHashMap<Signature, GcHandle>,
    ) -> Result<(GcHandle, bool), CacheError> {
        let graph = Graph::from_spec(&record.graph)?;
        let signature = record.signature.unwrap_or_else(|| {
            make_gc_signature(
                &record.gca.unwrap_or(NULL_SIGNATURE),
                &record.gcb.unwrap_or(NULL_SIGNATURE),
                &graph,
            )
        });
        if let Some(&existing) = index.get(&signature) {
            self.touch(existing);
            return Ok((existing, false));
        }

        let purges = self.purges;
        let handle = self.assign_index()?;
        if self.purges != purges {
            *index = self.signature_index();
        }

        let mut deps = [GcRef::Empty; 4];
        let mut missing = false;
        for field in DependencyField::ALL {
            deps[field.index()] = match record.dependency(field) {
                None => GcRef::Empty,
                Some(sig) => index.get(&sig).map_or_else(
                    || {
                        missing = true;
                        GcRef::Purged
                    },
                    |&dep| GcRef::Resident(dep),
                ),
            };
        }
        self.fill(handle, deps, graph, record.properties, record.usage);
        self.signature[handle.index()].set(Some(signature));
        if missing || record.is_codon() {
            let generation = if record.is_codon() {
                0
            } else {
                record.generation
            };
            self.attach_leaf(
                handle,
                LeafData {
                    owner: handle,
                    signature,
                    generation,
                    dependencies: DependencyField::ALL.map(|f| record.dependency(f)),
                },
            );
        }
        self.release(handle);
        index.insert(signature, handle);
        Ok((handle, true))
    }

    /// Insert a genetic code built around resident children.
    ///
    /// Returns the existing entry if the derived signature is already
    /// resident. The new entry starts dirty since the gene pool has never
    /// seen it.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidReference`] if a dependency is not resident and
    /// [`CacheError::CapacityExhausted`] if no slot can be found.
    pub fn insert_parts(&mut self, parts: GcParts) -> Result<GcHandle, CacheError> {
        let handles = parts.dependencies();
        for dep in handles.iter().flatten() {
            self.check_resident(*dep)?;
        }
        let codon = parts.gca.is_none() && parts.gcb.is_none();
        let sig_of = |dep: Option<GcHandle>| dep.map_or(NULL_SIGNATURE, |h| self.signature_at(h));
        let signature = match parts.signature {
            Some(sig) if codon => sig,
            _ => make_gc_signature(&sig_of(parts.gca), &sig_of(parts.gcb), &parts.graph),
        };
        if let Some(existing) = self.find(&signature) {
            self.touch(existing);
            return Ok(existing);
        }

        let pinned: Vec<GcHandle> = handles
            .iter()
            .flatten()
            .copied()
            .filter(|h| self.pin(*h))
            .collect();
        let assigned = self.assign_index();
        for h in &pinned {
            self.release(*h);
        }
        let handle = assigned?;

        let deps = handles.map(|dep| dep.map_or(GcRef::Empty, GcRef::Resident));
        self.fill(
            handle,
            deps,
            parts.graph,
            parts.properties,
            Usage::default(),
        );
        if codon {
            self.attach_leaf(
                handle,
                LeafData {
                    owner: handle,
                    signature,
                    generation: 0,
                    dependencies: [None; 4],
                },
            );
        }
        self.dirty[handle.index()] = true;
        self.release(handle);
        Ok(handle)
    }

    // ── Mutation ────────────────────────────────────────────────────────

    /// Apply `f` to the usage statistics of `handle` and mark it dirty.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidReference`] if `handle` is not resident.
    pub fn update_usage(
        &mut self,
        handle: GcHandle,
        f: impl FnOnce(&mut Usage),
    ) -> Result<(), CacheError> {
        self.check_resident(handle)?;
        f(&mut self.usage[handle.index()]);
        self.dirty[handle.index()] = true;
        self.touch(handle);
        Ok(())
    }

    /// Flag `handle` for the next flush.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidReference`] if `handle` is not resident.
    pub fn mark_dirty(&mut self, handle: GcHandle) -> Result<(), CacheError> {
        self.check_resident(handle)?;
        self.dirty[handle.index()] = true;
        Ok(())
    }

    /// Local reference of `handle`, allocated on first request.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidReference`] if `handle` is not resident and
    /// [`CacheError::Reference`] if the reference space is exhausted.
    pub fn reference_of(&mut self, handle: GcHandle) -> Result<i64, CacheError> {
        self.check_resident(handle)?;
        if let Some(r) = self.reference[handle.index()] {
            return Ok(r);
        }
        let r = reference(self.config.gpspuid, &mut self.refs)?;
        self.reference[handle.index()] = Some(r);
        Ok(r)
    }

    /// Free one entry outside a purge. A dirty entry is pushed first.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidReference`] if `handle` is not resident and
    /// [`CacheError::StillReferenced`] if another entry depends on it.
    pub fn remove(&mut self, handle: GcHandle) -> Result<(), CacheError> {
        self.check_resident(handle)?;
        let target = GcRef::Resident(handle);
        let referrer = self.occupied_slots().find(|other| {
            DependencyField::ALL
                .iter()
                .any(|f| self.dependency_at(*other, *f) == target)
        });
        if let Some(by) = referrer {
            return Err(CacheError::StillReferenced { handle, by });
        }
        if self.dirty[handle.index()] {
            let record = self.record_at(handle);
            self.pool.push(std::slice::from_ref(&record));
        }
        self.reclaim(handle);
        Ok(())
    }

    /// Pull a purged dependency of `handle` back into the cache and relink it.
    ///
    /// Returns the dependency's handle, or `None` if the field is empty or the
    /// gene pool does not know the signature.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidReference`] if `handle` is not resident, plus any
    /// error from inserting the pulled record.
    pub fn rehydrate(
        &mut self,
        handle: GcHandle,
        field: DependencyField,
    ) -> Result<Option<GcHandle>, CacheError> {
        self.check_resident(handle)?;
        match self.dependency_at(handle, field) {
            GcRef::Resident(dep) => return Ok(Some(dep)),
            GcRef::Empty => return Ok(None),
            GcRef::Purged => {}
        }
        let Some(leaf) = self.leaf(handle) else {
            return Ok(None);
        };
        let Some(signature) = leaf.dependencies[field.index()] else {
            return Ok(None);
        };
        let dep = match self.find(&signature) {
            Some(dep) => dep,
            None => {
                let Some(record) = self.pool.pull(&signature) else {
                    return Ok(None);
                };
                self.pin(handle);
                let inserted = self.insert(record);
                self.release(handle);
                inserted?
            }
        };
        self.dependencies[field.index()][handle.index()] = GcRef::Resident(dep);
        Ok(Some(dep))
    }

    /// Flush every dirty entry, discard all entries and resize to `capacity`
    /// (or keep the current capacity).
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidConfig`] if the new capacity is invalid; the cache
    /// is left untouched in that case.
    #[instrument(skip_all)]
    pub fn reset(&mut self, capacity: Option<usize>) -> Result<(), CacheError> {
        let mut config = self.config.clone();
        if let Some(capacity) = capacity {
            config.capacity = capacity;
        }
        config.validate()?;
        let flushed = self.flush();
        let discarded = self.occupied;
        let pool = std::mem::replace(&mut self.pool, Box::new(MemoryGenePool::new()));
        let refs = std::mem::take(&mut self.refs);
        *self = Self::with_pool(config, pool)?;
        self.refs = refs;
        info!(
            flushed,
            discarded,
            capacity = self.capacity(),
            "cache reset"
        );
        Ok(())
    }

    /// Push every dirty resident entry to the gene pool and clear the dirty bits.
    fn flush(&mut self) -> usize {
        let dirty: Vec<GcHandle> = self.handles().filter(|h| self.dirty[h.index()]).collect();
        if dirty.is_empty() {
            return 0;
        }
        let records: Vec<GcRecord> = dirty.iter().map(|h| self.record_at(*h)).collect();
        self.pool.push(&records);
        for h in &dirty {
            self.dirty[h.index()] = false;
        }
        dirty.len()
    }

    // ── Diagnostics ─────────────────────────────────────────────────────

    /// Check the structural invariants; an empty list means consistent.
    pub fn check_consistency(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for h in self.occupied_slots() {
            let frozen = self.leaf(h).map(|l| l.dependencies);
            for field in DependencyField::ALL {
                match self.dependency_at(h, field) {
                    GcRef::Resident(dep) if !self.is_occupied(dep) => {
                        problems.push(format!("{h} {} references free slot {dep}", field.name()));
                    }
                    GcRef::Purged if frozen.and_then(|d| d[field.index()]).is_none() => {
                        problems.push(format!(
                            "{h} {} is purged without a frozen signature",
                            field.name()
                        ));
                    }
                    _ => {}
                }
            }
            if let Some(ds) = self.ds_index[h.index()] {
                match self.ds.get(ds) {
                    Some(leaf) if leaf.owner == h => {}
                    Some(leaf) => {
                        problems.push(format!("{h} leaf data is owned by {}", leaf.owner));
                    }
                    None => problems.push(format!("{h} points at released leaf data {ds}")),
                }
            }
        }

        let mut seen = vec![false; self.capacity()];
        for &slot in &self.free {
            let i = GcHandle(slot).index();
            match self.state.get(i) {
                Some(SlotState::Free) if !seen[i] => seen[i] = true,
                Some(SlotState::Free) => {
                    problems.push(format!("gc#{slot} is on the free list twice"));
                }
                _ => problems.push(format!("gc#{slot} is on the free list but occupied")),
            }
        }
        for (i, state) in self.state.iter().enumerate() {
            if *state == SlotState::Free {
                if i < self.next_virgin && !seen[i] {
                    problems.push(format!("gc#{i} is free but not on the free list"));
                }
                if self.access_sequence[i].get() != u64::MAX {
                    problems.push(format!("gc#{i} is free with a live access stamp"));
                }
                if self.ds_index[i].is_some() {
                    problems.push(format!("gc#{i} is free but holds leaf data"));
                }
            }
        }

        let owners = self.ds_index.iter().flatten().count();
        if owners != self.ds.live() {
            problems.push(format!("{} leaf records for {owners} leaf slots", self.ds.live()));
        }
        problems
    }
}

impl fmt::Debug for GeneticCodeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneticCodeCache")
            .field("capacity", &self.capacity())
            .field("occupied", &self.occupied)
            .field("leaves", &self.ds.live())
            .field("free", &self.free.len())
            .field("purges", &self.purges)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::connection_spec::ConnectionSpec;
    use crate::ep_type::INT;
    use crate::row::Row;

    fn cache(capacity: usize) -> GeneticCodeCache {
        let config = CacheConfig::with_capacity(capacity);
        GeneticCodeCache::new(config).unwrap()
    }

    fn codon(sig: u8) -> GcRecord {
        let mut r = GcRecord::from_graph(ConnectionSpec::from_parts(
            &[(Row::O, &[(Row::I, 0, INT)])],
            &[],
        ));
        r.signature = Some(Signature([sig; 32]));
        r
    }

    fn parent(gca: u8, gcb: u8) -> GcRecord {
        let mut r = GcRecord::from_graph(ConnectionSpec::from_parts(
            &[
                (Row::A, &[(Row::I, 0, INT)]),
                (Row::B, &[(Row::A, 0, INT)]),
                (Row::O, &[(Row::B, 0, INT)]),
            ],
            &[],
        ));
        r.gca = Some(Signature([gca; 32]));
        r.gcb = Some(Signature([gcb; 32]));
        r
    }

    #[test]
    fn insert_resolves_dependencies_by_signature() {
        let mut cache = cache(8);
        let a = cache.insert(codon(1)).unwrap();
        let b = cache.insert(codon(2)).unwrap();
        let p = cache.insert(parent(1, 2)).unwrap();
        let view = cache.get(p).unwrap();
        assert_eq!(view.gca(), GcRef::Resident(a));
        assert_eq!(view.gcb(), GcRef::Resident(b));
        assert_eq!(view.generation(), 1);
        assert!(!view.is_leaf());
        assert!(cache.is_leaf(a));
        assert_eq!(cache.len(), 3);
        assert!(cache.check_consistency().is_empty());
    }

    #[test]
    fn missing_dependencies_make_a_leaf() {
        let mut cache = cache(8);
        let mut record = parent(1, 2);
        record.generation = 7;
        let p = cache.insert(record.clone()).unwrap();
        let view = cache.get(p).unwrap();
        assert_eq!(view.gca(), GcRef::Purged);
        assert_eq!(view.generation(), 7);
        assert!(view.is_leaf());
        let back = view.to_record();
        assert_eq!(back.gca, record.gca);
        assert_eq!(back.graph, record.graph);
    }

    #[test]
    fn update_skips_duplicates() {
        let mut cache = cache(8);
        let added = cache.update([codon(1), codon(2), codon(1)]).unwrap();
        assert_eq!(added.len(), 2);
        assert_eq!(cache.update([codon(2)]).unwrap(), Vec::new());
    }

    #[test]
    fn usage_writes_mark_dirty() {
        let mut cache = cache(4);
        let a = cache.insert(codon(1)).unwrap();
        assert!(!cache.is_dirty(a));
        cache.update_usage(a, |u| u.fitness = 0.5).unwrap();
        assert!(cache.is_dirty(a));
        assert!((cache.get(a).unwrap().usage().fitness - 0.5).abs() < f64::EPSILON);
        assert_eq!(
            cache.update_usage(GcHandle(3), |_| {}),
            Err(CacheError::InvalidReference {
                handle: GcHandle(3),
            })
        );
    }

    #[test]
    fn remove_refuses_referenced_entries() {
        let mut cache = cache(8);
        let a = cache.insert(codon(1)).unwrap();
        cache.insert(codon(2)).unwrap();
        let p = cache.insert(parent(1, 2)).unwrap();
        assert_eq!(
            cache.remove(a),
            Err(CacheError::StillReferenced { handle: a, by: p })
        );
        cache.remove(p).unwrap();
        cache.remove(a).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.check_consistency().is_empty());
    }

    #[test]
    fn insert_parts_rejects_non_resident_children() {
        let mut cache = cache(4);
        let parts = GcParts {
            gca: Some(GcHandle(2)),
            ..GcParts::default()
        };
        assert_eq!(
            cache.insert_parts(parts),
            Err(CacheError::InvalidReference {
                handle: GcHandle(2),
            })
        );
    }

    #[test]
    fn references_are_stable_per_entry() {
        let mut cache = cache(4);
        let a = cache.insert(codon(1)).unwrap();
        let b = cache.insert(codon(2)).unwrap();
        let ra = cache.reference_of(a).unwrap();
        assert_eq!(cache.reference_of(a).unwrap(), ra);
        assert_ne!(cache.reference_of(b).unwrap(), ra);
    }

    #[test]
    fn reset_flushes_and_resizes() {
        let mut cache = cache(4);
        let a = cache.insert(codon(1)).unwrap();
        cache.mark_dirty(a).unwrap();
        cache.reset(Some(16)).unwrap();
        assert_eq!(cache.capacity(), 16);
        assert!(cache.is_empty());
        assert!(cache.pool().contains(&Signature([1; 32])));
        assert!(cache.reset(Some(0)).is_err());
        assert_eq!(cache.capacity(), 16);
    }

    #[test]
    fn dynamic_store_reuses_released_records() {
        let leaf = |owner: u32| LeafData {
            owner: GcHandle(owner),
            signature: Signature([1; 32]),
            generation: 0,
            dependencies: [None; 4],
        };
        let mut ds = DynamicStore::default();
        let a = ds.alloc(leaf(0));
        let b = ds.alloc(leaf(1));
        assert_eq!((a, b), (0, 1));
        ds.release(a);
        ds.release(a);
        assert!(ds.get(a).is_none());
        assert_eq!(ds.live(), 1);
        assert_eq!(ds.alloc(leaf(2)), a);
        assert_eq!(ds.get(a).map(|l| l.owner), Some(GcHandle(2)));
        assert_eq!(ds.alloc(leaf(3)), 2);
        assert_eq!(ds.live(), 3);
    }

    #[test]
    fn leaf_records_follow_their_slots() {
        let mut cache = cache(4);
        let a = cache.insert(codon(1)).unwrap();
        let b = cache.insert(codon(2)).unwrap();
        cache.remove(a).unwrap();
        assert!(!cache.is_leaf(a));
        let c = cache.insert(codon(3)).unwrap();
        assert_eq!(c, a);
        assert!(cache.is_leaf(b) && cache.is_leaf(c));
        assert_eq!(cache.ds.live(), 2);
        assert_eq!(cache.get(c).unwrap().signature(), Signature([3; 32]));
        assert!(cache.check_consistency().is_empty());
    }
}
