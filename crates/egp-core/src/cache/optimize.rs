// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Relinking and structural sharing.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{info, instrument};

use super::GeneticCodeCache;
use crate::connections::ConnectionTable;
use crate::genetic_code::{DependencyField, GcHandle, GcRef};
use crate::graph::Graph;
use crate::interface::Interface;
use crate::rows::RowSet;

/// What one [`GeneticCodeCache::optimize`] pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeReport {
    /// Purged dependency fields pointed back at resident entries.
    pub relinked: usize,
    /// Entries that released their leaf data.
    pub unleafed: usize,
    /// Interfaces replaced by an equal shared allocation.
    pub interfaces: usize,
    /// Row sets replaced by an equal shared allocation.
    pub row_sets: usize,
    /// Connection tables replaced by an equal shared allocation.
    pub connection_tables: usize,
    /// Graphs replaced by an equal shared graph.
    pub graphs: usize,
}

/// Return the shared copy of `value`, registering it if it is the first.
fn canonical<T: Eq + std::hash::Hash>(
    seen: &mut FxHashSet<Arc<T>>,
    value: &Arc<T>,
    swaps: &mut usize,
) -> Arc<T> {
    match seen.get(value) {
        Some(shared) => {
            if !Arc::ptr_eq(shared, value) {
                *swaps += 1;
            }
            Arc::clone(shared)
        }
        None => {
            seen.insert(Arc::clone(value));
            Arc::clone(value)
        }
    }
}

impl GeneticCodeCache {
    /// Undo leaf conversions whose dependencies are resident again, then
    /// collapse structurally equal interfaces, row sets, connection tables and
    /// graphs onto single allocations.
    ///
    /// Lookups are hash based; the pass is linear in the number of entries.
    #[instrument(skip_all)]
    pub fn optimize(&mut self) -> OptimizeReport {
        let mut report = OptimizeReport::default();
        self.unleaf(&mut report);
        self.share_graphs(&mut report);
        info!(
            relinked = report.relinked,
            unleafed = report.unleafed,
            interfaces = report.interfaces,
            row_sets = report.row_sets,
            connection_tables = report.connection_tables,
            graphs = report.graphs,
            "optimize"
        );
        report
    }

    fn unleaf(&mut self, report: &mut OptimizeReport) {
        let index: FxHashMap<_, GcHandle> = self.signature_index();
        let leaves: Vec<GcHandle> = self.leaves().collect();
        for h in leaves {
            let Some(frozen) = self.leaf(h).map(|leaf| leaf.dependencies) else {
                continue;
            };
            for field in DependencyField::ALL {
                if self.dependency_at(h, field) != GcRef::Purged {
                    continue;
                }
                let Some(sig) = frozen[field.index()] else {
                    continue;
                };
                if let Some(&dep) = index.get(&sig).filter(|dep| **dep != h) {
                    self.dependencies[field.index()][h.index()] = GcRef::Resident(dep);
                    report.relinked += 1;
                }
            }
            let codon = self.dependency_at(h, DependencyField::Gca).is_empty()
                && self.dependency_at(h, DependencyField::Gcb).is_empty();
            let whole = DependencyField::ALL
                .iter()
                .all(|f| !self.dependency_at(h, *f).is_purged());
            if whole && !codon {
                // The memo columns keep the frozen values.
                if let Some(ds) = self.ds_index[h.index()].take() {
                    self.ds.release(ds);
                    report.unleafed += 1;
                }
            }
        }
    }

    fn share_graphs(&mut self, report: &mut OptimizeReport) {
        let mut interfaces: FxHashSet<Arc<Interface>> = FxHashSet::default();
        let mut row_sets: FxHashSet<Arc<RowSet>> = FxHashSet::default();
        let mut tables: FxHashSet<Arc<ConnectionTable>> = FxHashSet::default();
        let mut graphs: FxHashSet<Graph> = FxHashSet::default();

        let occupied: Vec<GcHandle> = self.occupied_slots().collect();
        for h in occupied {
            let mut graph = self.graph[h.index()].clone();

            let rows = graph.rows();
            let shared = rows.with_interfaces(|iface| {
                canonical(&mut interfaces, iface, &mut report.interfaces)
            });
            let rows = if shared.shares_interfaces(rows) {
                Arc::clone(rows)
            } else {
                Arc::new(shared)
            };
            let rows = canonical(&mut row_sets, &rows, &mut report.row_sets);
            if !Arc::ptr_eq(&rows, graph.rows()) {
                graph = graph.with_rows(rows);
            }

            let table = canonical(
                &mut tables,
                graph.connections(),
                &mut report.connection_tables,
            );
            if !Arc::ptr_eq(&table, graph.connections()) {
                graph = graph.with_connections(table);
            }

            if let Some(existing) = graphs.get(&graph) {
                if !existing.shares_storage(&graph) {
                    report.graphs += 1;
                    graph = existing.clone();
                }
            } else {
                graphs.insert(graph.clone());
            }
            self.graph[h.index()] = graph;
        }
    }
}
