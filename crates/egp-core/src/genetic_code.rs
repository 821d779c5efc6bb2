// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Genetic code handles and views.
//!
//! A genetic code has no storage of its own. [`GcHandle`] is a slot index
//! into the [`GeneticCodeCache`] columns and [`GeneticCode`] is a borrowed view
//! that reads those columns. Every read through a view touches the entry so
//! the cache sees it as recently used.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cache::GeneticCodeCache;
use crate::graph::Graph;
use crate::ident::Signature;
use crate::properties::Properties;
use crate::record::GcRecord;

/// Slot index of a genetic code in its cache.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct GcHandle(pub u32);

impl GcHandle {
    /// Slot index as `usize`.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GcHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gc#{}", self.0)
    }
}

/// Value of a dependency field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum GcRef {
    /// A resident genetic code.
    Resident(GcHandle),
    /// No genetic code.
    #[default]
    Empty,
    /// A genetic code exists but is not resident; its signature is frozen in
    /// the owner's leaf data.
    Purged,
}

impl GcRef {
    /// Handle of the referenced entry if it is resident.
    pub const fn handle(self) -> Option<GcHandle> {
        match self {
            Self::Resident(h) => Some(h),
            Self::Empty | Self::Purged => None,
        }
    }

    /// Returns `true` for [`GcRef::Empty`].
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns `true` for [`GcRef::Purged`].
    pub const fn is_purged(self) -> bool {
        matches!(self, Self::Purged)
    }
}

/// The four structural dependency fields of a genetic code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DependencyField {
    /// Sub-graph A.
    Gca,
    /// Sub-graph B.
    Gcb,
    /// First ancestor.
    AncestorA,
    /// Second ancestor.
    AncestorB,
}

impl DependencyField {
    /// Every field in storage order.
    pub const ALL: [Self; 4] = [Self::Gca, Self::Gcb, Self::AncestorA, Self::AncestorB];

    /// Position in [`ALL`](Self::ALL).
    pub const fn index(self) -> usize {
        match self {
            Self::Gca => 0,
            Self::Gcb => 1,
            Self::AncestorA => 2,
            Self::AncestorB => 3,
        }
    }

    /// Record field name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gca => "gca",
            Self::Gcb => "gcb",
            Self::AncestorA => "ancestor_a",
            Self::AncestorB => "ancestor_b",
        }
    }
}

/// Usage statistics of a genetic code.
///
/// The `_all` fields accumulate over the lifetime of the genetic code; the
/// others cover the current layer only.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    /// Executions.
    pub e_count: i64,
    /// Evolvability.
    pub evolvability: f64,
    /// Fitness evaluations.
    pub f_count: i64,
    /// Fitness.
    pub fitness: f64,
    /// Number of genetic codes referencing this one.
    pub reference_count: i64,
    /// Survivability.
    pub survivability: f64,
    /// Executions, all time.
    pub e_count_all: i64,
    /// Evolvability, all time.
    pub evolvability_all: f64,
    /// Referencing genetic codes, all time.
    pub reference_count_all: i64,
}

impl Default for Usage {
    fn default() -> Self {
        Self {
            e_count: 1,
            evolvability: 1.0,
            f_count: 0,
            fitness: 0.0,
            reference_count: 0,
            survivability: 0.0,
            e_count_all: 1,
            evolvability_all: 1.0,
            reference_count_all: 0,
        }
    }
}

/// Borrowed view of one resident genetic code.
#[derive(Clone, Copy)]
pub struct GeneticCode<'a> {
    cache: &'a GeneticCodeCache,
    handle: GcHandle,
}

impl<'a> GeneticCode<'a> {
    pub(crate) const fn new(cache: &'a GeneticCodeCache, handle: GcHandle) -> Self {
        Self { cache, handle }
    }

    /// Slot of this genetic code.
    pub const fn handle(&self) -> GcHandle {
        self.handle
    }

    /// Sub-graph A.
    pub fn gca(&self) -> GcRef {
        self.dependency(DependencyField::Gca)
    }

    /// Sub-graph B.
    pub fn gcb(&self) -> GcRef {
        self.dependency(DependencyField::Gcb)
    }

    /// First ancestor.
    pub fn ancestor_a(&self) -> GcRef {
        self.dependency(DependencyField::AncestorA)
    }

    /// Second ancestor.
    pub fn ancestor_b(&self) -> GcRef {
        self.dependency(DependencyField::AncestorB)
    }

    /// Any dependency field.
    pub fn dependency(&self, field: DependencyField) -> GcRef {
        self.cache.touch(self.handle);
        self.cache.dependency_at(self.handle, field)
    }

    /// Dependency field resolved to a view when resident.
    pub fn child(&self, field: DependencyField) -> Option<GeneticCode<'a>> {
        self.dependency(field)
            .handle()
            .map(|h| GeneticCode::new(self.cache, h))
    }

    /// Wiring.
    pub fn graph(&self) -> &'a Graph {
        self.cache.touch(self.handle);
        self.cache.graph_at(self.handle)
    }

    /// Content signature, computed on first use.
    pub fn signature(&self) -> Signature {
        self.cache.touch(self.handle);
        self.cache.signature_at(self.handle)
    }

    /// Generation: 0 for codons, otherwise one more than the oldest child.
    pub fn generation(&self) -> u64 {
        self.cache.touch(self.handle);
        self.cache.generation_at(self.handle)
    }

    /// Property flags.
    pub fn properties(&self) -> Properties {
        self.cache.touch(self.handle);
        self.cache.properties_at(self.handle)
    }

    /// Usage statistics.
    pub fn usage(&self) -> Usage {
        self.cache.touch(self.handle);
        self.cache.usage_at(self.handle)
    }

    /// Returns `true` if this entry holds frozen leaf data.
    pub fn is_leaf(&self) -> bool {
        self.cache.is_leaf(self.handle)
    }

    /// Returns `true` if this entry has neither sub-graph.
    pub fn is_codon(&self) -> bool {
        self.gca().is_empty() && self.gcb().is_empty()
    }

    /// Returns `true` if this entry has changes not yet pushed to the gene pool.
    pub fn is_dirty(&self) -> bool {
        self.cache.is_dirty(self.handle)
    }

    /// Declarative record form.
    pub fn to_record(&self) -> GcRecord {
        self.cache.touch(self.handle);
        self.cache.record_at(self.handle)
    }
}

impl fmt::Debug for GeneticCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dep = |field| self.cache.dependency_at(self.handle, field);
        f.debug_struct("GeneticCode")
            .field("handle", &self.handle)
            .field("gca", &dep(DependencyField::Gca))
            .field("gcb", &dep(DependencyField::Gcb))
            .finish_non_exhaustive()
    }
}
