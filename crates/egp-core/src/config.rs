// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cache configuration.

use serde::{Deserialize, Serialize};

use crate::ep_type::{is_valid, EndPointType, INT};
use crate::error::CacheError;

/// Default number of cache slots (2^16).
pub const DEFAULT_CAPACITY: usize = 1 << 16;
/// Default share of the capacity reclaimed by one purge.
pub const DEFAULT_PURGE_FRACTION: f64 = 0.25;

/// Settings for [`GeneticCodeCache`](crate::GeneticCodeCache).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of slots.
    pub capacity: usize,
    /// Share of `capacity` selected for eviction when the cache is full.
    pub purge_fraction: f64,
    /// Gene pool sub-process id stamped into references.
    pub gpspuid: u32,
    /// Random genetic code construction.
    pub random: RandomGraphConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            purge_fraction: DEFAULT_PURGE_FRACTION,
            gpspuid: 0,
            random: RandomGraphConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Default configuration with a different capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Reject settings the cache cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfig`] describing the first bad field.
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.capacity == 0 || u32::try_from(self.capacity).is_err() {
            return Err(CacheError::InvalidConfig(format!(
                "capacity {} must be in 1..=4294967295",
                self.capacity
            )));
        }
        if !(self.purge_fraction > 0.0 && self.purge_fraction <= 1.0) {
            return Err(CacheError::InvalidConfig(format!(
                "purge_fraction {} must be in (0, 1]",
                self.purge_fraction
            )));
        }
        self.random.validate()
    }
}

/// Shape limits for randomly generated graphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomGraphConfig {
    /// Upper bound on endpoints per row and class (at least one is created).
    pub max_row_endpoints: u8,
    /// Types drawn from for new endpoints.
    pub endpoint_types: Vec<EndPointType>,
}

impl Default for RandomGraphConfig {
    fn default() -> Self {
        Self {
            max_row_endpoints: 8,
            endpoint_types: vec![INT],
        }
    }
}

impl RandomGraphConfig {
    /// Reject settings random construction cannot honour.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfig`] if no endpoint may be created or a
    /// listed type is not valid.
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.max_row_endpoints == 0 {
            return Err(CacheError::InvalidConfig("max_row_endpoints must be at least 1".into()));
        }
        if self.endpoint_types.is_empty() {
            return Err(CacheError::InvalidConfig("endpoint_types must not be empty".into()));
        }
        if let Some(bad) = self.endpoint_types.iter().find(|t| !is_valid(**t)) {
            return Err(CacheError::InvalidConfig(format!("endpoint type {bad} is not valid")));
        }
        Ok(())
    }
}
