// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Drive a cache through random populations.

use anyhow::{bail, Context, Result};
use comfy_table::Table;
use egp_config::{ConfigService, FsConfigStore};
use egp_core::GeneticCodeCache;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

use crate::settings::load_cache_config;

pub struct ChurnArgs {
    pub trees: u32,
    pub depth: u32,
    pub capacity: Option<usize>,
    pub purge_fraction: Option<f64>,
    pub seed: u64,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ChurnSummary {
    capacity: usize,
    trees: u32,
    depth: u32,
    entries: usize,
    leaves: usize,
    purges: u64,
    relinked: usize,
    unleafed: usize,
    shared_interfaces: usize,
    shared_row_sets: usize,
    shared_connection_tables: usize,
    shared_graphs: usize,
    consistent: bool,
}

impl ChurnSummary {
    fn table(&self) -> Table {
        let mut table = Table::new();
        table.set_header(vec!["metric", "value"]);
        let rows: [(&str, String); 13] = [
            ("capacity", self.capacity.to_string()),
            ("trees", self.trees.to_string()),
            ("depth", self.depth.to_string()),
            ("entries", self.entries.to_string()),
            ("leaves", self.leaves.to_string()),
            ("purges", self.purges.to_string()),
            ("relinked", self.relinked.to_string()),
            ("unleafed", self.unleafed.to_string()),
            ("shared interfaces", self.shared_interfaces.to_string()),
            ("shared row sets", self.shared_row_sets.to_string()),
            ("shared connection tables", self.shared_connection_tables.to_string()),
            ("shared graphs", self.shared_graphs.to_string()),
            ("consistent", self.consistent.to_string()),
        ];
        for (metric, value) in rows {
            table.add_row(vec![metric.to_owned(), value]);
        }
        table
    }
}

pub fn churn(config: &ConfigService<FsConfigStore>, args: &ChurnArgs) -> Result<()> {
    let mut cache_config = load_cache_config(config)?;
    if let Some(capacity) = args.capacity {
        cache_config.capacity = capacity;
    }
    if let Some(fraction) = args.purge_fraction {
        cache_config.purge_fraction = fraction;
    }
    let mut cache = GeneticCodeCache::new(cache_config)?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    let depth = args.depth;
    for tree in 0..args.trees {
        cache
            .random(depth, &mut rng)
            .with_context(|| format!("tree {tree} of depth {depth} does not fit the cache"))?;
    }
    let optimized = cache.optimize();
    let problems = cache.check_consistency();

    let summary = ChurnSummary {
        capacity: cache.capacity(),
        trees: args.trees,
        depth: args.depth,
        entries: cache.len(),
        leaves: cache.leaves().count(),
        purges: cache.purge_count(),
        relinked: optimized.relinked,
        unleafed: optimized.unleafed,
        shared_interfaces: optimized.interfaces,
        shared_row_sets: optimized.row_sets,
        shared_connection_tables: optimized.connection_tables,
        shared_graphs: optimized.graphs,
        consistent: problems.is_empty(),
    };
    let (entries, purges) = (summary.entries, summary.purges);
    info!(entries, purges, "churn complete");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.table());
    }
    if !problems.is_empty() {
        bail!("cache is inconsistent: {}", problems.join("; "));
    }
    Ok(())
}
