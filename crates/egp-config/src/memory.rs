// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory `ConfigStore`.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::config::{check_key, ConfigError, ConfigStore};

/// Config blobs held in a map; nothing touches the filesystem.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    blobs: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MemoryConfigStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `key` has been saved.
    pub fn contains(&self, key: &str) -> bool {
        self.blobs.borrow().contains_key(key)
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        check_key(key)?;
        self.blobs
            .borrow()
            .get(key)
            .cloned()
            .ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        check_key(key)?;
        self.blobs
            .borrow_mut()
            .insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}
