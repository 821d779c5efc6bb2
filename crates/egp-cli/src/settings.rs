// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted cache config.

use std::path::Path;

use anyhow::{Context, Result};
use egp_config::{ConfigService, FsConfigStore};
use egp_core::CacheConfig;
use tracing::debug;

use crate::cli::ConfigAction;

/// Key the cache config is stored under.
pub const CACHE_KEY: &str = "cache";

pub fn open_config(dir: Option<&Path>) -> Result<ConfigService<FsConfigStore>> {
    let store = match dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    }
    .context("failed to open config store")?;
    debug!(base = %store.base().display(), "config store");
    Ok(ConfigService::new(store))
}

pub fn load_cache_config(config: &ConfigService<FsConfigStore>) -> Result<CacheConfig> {
    config
        .load_or_init::<CacheConfig>(CACHE_KEY)
        .with_context(|| format!("failed to load config key {CACHE_KEY:?}"))
}

pub fn config_command(config: &ConfigService<FsConfigStore>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let current = load_cache_config(config)?;
            println!("{}", serde_json::to_string_pretty(&current)?);
        }
        ConfigAction::Path => println!("{}", config.store().base().display()),
        ConfigAction::Set {
            capacity,
            purge_fraction,
            gpspuid,
            max_row_endpoints,
        } => {
            let mut updated = load_cache_config(config)?;
            if let Some(capacity) = capacity {
                updated.capacity = capacity;
            }
            if let Some(fraction) = purge_fraction {
                updated.purge_fraction = fraction;
            }
            if let Some(gpspuid) = gpspuid {
                updated.gpspuid = gpspuid;
            }
            if let Some(max) = max_row_endpoints {
                updated.random.max_row_endpoints = max;
            }
            updated.validate()?;
            config
                .save(CACHE_KEY, &updated)
                .context("failed to save config")?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
    }
    Ok(())
}
