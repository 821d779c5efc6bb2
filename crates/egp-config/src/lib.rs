// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Config storage for EGP tools.
//!
//! [`ConfigService`] serializes values as JSON and delegates raw storage to a
//! [`ConfigStore`]. [`FsConfigStore`] keeps one `<key>.json` file per key under
//! the platform config directory; [`MemoryConfigStore`] is the in-process
//! store used by tests.

pub mod config;
mod fs;
mod memory;

pub use config::{ConfigError, ConfigService, ConfigStore};
pub use fs::FsConfigStore;
pub use memory::MemoryConfigStore;
