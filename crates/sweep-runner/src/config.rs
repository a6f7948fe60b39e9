//! Runner configuration
//!
//! Loaded from TOML; every field is optional.
//!
//! ```toml
//! log_filter = "sweep_tree=debug,info"
//! max_combinations = 100
//! stop_on_skip = false
//! tree_file = "experiments/ring.json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration load failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid configuration
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Stop after this many produced elements, skips included
    pub max_combinations: Option<u64>,
    /// Stop at the first skipped combination
    pub stop_on_skip: bool,
    /// Persisted tree to run
    pub tree_file: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            max_combinations: None,
            stop_on_skip: false,
            tree_file: None,
        }
    }
}

impl RunnerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With combination limit
    #[inline]
    #[must_use]
    pub fn with_max_combinations(mut self, max: u64) -> Self {
        self.max_combinations = Some(max);
        self
    }

    /// With stop-on-skip
    #[inline]
    #[must_use]
    pub fn with_stop_on_skip(mut self, stop: bool) -> Self {
        self.stop_on_skip = stop;
        self
    }

    /// With tree file
    #[inline]
    #[must_use]
    pub fn with_tree_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tree_file = Some(path.into());
        self
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed text or unknown value types.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("loaded runner configuration from {}", path.display());
        Ok(config)
    }
}
