use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_SHARD_COUNT: usize = 16;
pub const DEFAULT_PENDING_WARN_THRESHOLD: usize = 1024;

/// Tuning for a [`RollbackCoordinator`](crate::RollbackCoordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackConfig {
    shard_count: usize,
    pending_warn_threshold: Option<usize>,
}

impl Default for RollbackConfig {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            pending_warn_threshold: Some(DEFAULT_PENDING_WARN_THRESHOLD),
        }
    }
}

impl RollbackConfig {
    /// Number of independently locked registry shards.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// Pending-list length past which registration logs a warning.
    #[must_use]
    pub fn pending_warn_threshold(&self) -> Option<usize> {
        self.pending_warn_threshold
    }

    #[must_use]
    pub fn with_shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count.max(1);
        self
    }

    /// Set the warning threshold. `None` or `Some(0)` disables the warning.
    #[must_use]
    pub fn with_pending_warn_threshold(mut self, threshold: Option<usize>) -> Self {
        self.pending_warn_threshold = threshold.filter(|threshold| *threshold > 0);
        self
    }

    /// Parse the `[rollback]` table of a TOML document.
    ///
    /// A missing table or key falls back to the default. A threshold of `0`
    /// disables the pending-list warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or a value is out of range.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        let section = file.rollback.unwrap_or_default();
        let defaults = Self::default();

        let shard_count = section.shard_count.unwrap_or(defaults.shard_count);
        if shard_count == 0 {
            return Err(ConfigError::InvalidShardCount);
        }

        let config = Self {
            shard_count,
            ..defaults
        };
        Ok(match section.pending_warn_threshold {
            None => config,
            threshold => config.with_pending_warn_threshold(threshold),
        })
    }

    /// Read and parse a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails to parse.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    rollback: Option<RollbackSection>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RollbackSection {
    shard_count: Option<usize>,
    pending_warn_threshold: Option<usize>,
}
