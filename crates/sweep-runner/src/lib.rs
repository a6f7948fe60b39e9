//! Sweep Runner
//!
//! Sequential execution of configuration trees and the `sweep` CLI.
//!
//! # Core Concepts
//!
//! - [`ExecutionManager`]: drains one enumeration pass into an [`Experiment`]
//! - [`RunnerConfig`]: TOML settings for limits, logging and the tree file
//! - [`demo_tree`]: a small routing study over the [`demo_catalog`]
//!
//! # Example
//!
//! ```rust,ignore
//! use sweep_runner::{demo_tree, ExecutionManager, RunnerConfig};
//!
//! let manager = ExecutionManager::new(RunnerConfig::new().with_max_combinations(10));
//! let summary = manager.run(&demo_tree()?, &mut |value: &Value, _: Option<&ObjectRecipe>| {
//!     println!("{value}");
//!     Ok(())
//! })?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod config;
mod demo;
mod manager;

// Re-exports
pub use config::{ConfigError, RunnerConfig};
pub use demo::{demo_catalog, demo_tree, Experiment as DemoExperiment, Routing, Topology, EXPERIMENT};
pub use manager::{ExecutionManager, Experiment, RunError, RunSummary};

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides `default_filter`.
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
