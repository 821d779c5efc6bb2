// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! EGP developer CLI.
//!
//! ```text
//! egp-cli churn [--trees N] [--depth D] [--capacity C] [--seed S] [--json]
//! egp-cli validate <graph.json>
//! egp-cli normalize <graph.json> [--out FILE] [--seed S]
//! egp-cli config show|path|set [...]
//! ```
//!
//! Every command takes `--config-dir` to point the config store somewhere
//! other than the platform config directory. The process exits non-zero on
//! error, including a graph with validation findings.
// The CLI is expected to print to stdout.
#![allow(clippy::print_stdout)]

mod churn;
pub mod cli;
mod graph_cmd;
mod settings;

pub use cli::{entrypoint, run, Cli, Commands, ConfigAction};
