//! Reconciler settings, loadable from TOML.
//!
//! Every key is optional; missing keys take the `Default` values:
//!
//! ```toml
//! queue_policy = "coalesce"      # or "reject"
//! parallel_diff_threshold = 64   # omit to keep diffing on one thread
//! trace_mutations = false
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vtree::DiffOptions;

/// What happens to a render request while another tree is still staged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueuePolicy {
    /// The newer tree replaces the staged one.
    #[default]
    Coalesce,
    /// The newer tree is refused.
    Reject,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcilerConfig {
    pub queue_policy: QueuePolicy,
    /// Minimum number of surviving keyed siblings before their subtrees
    /// are diffed on scoped threads.
    pub parallel_diff_threshold: Option<usize>,
    /// Log every applied mutation on `reconcile.commit` at `trace` level.
    pub trace_mutations: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid reconciler config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid reconciler config: {0}")]
    Invalid(String),
}

impl ReconcilerConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            parallel_threshold: self.parallel_diff_threshold,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel_diff_threshold == Some(0) {
            return Err(ConfigError::Invalid(
                "parallel_diff_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
