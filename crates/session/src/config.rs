//! Session configuration via `flowfile.toml`
//!
//! Shared by every session a `SessionFactory` hands out. A missing file
//! means defaults; `write_default_if_missing` drops a commented template.

use chrono::Duration;
use flowfile_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name used by `write_default_if_missing` callers.
pub const CONFIG_FILE_NAME: &str = "flowfile.toml";

fn default_penalty_duration_ms() -> u64 {
    30_000
}

fn default_max_batch_size() -> usize {
    10_000
}

/// Session configuration loaded from `flowfile.toml`.
///
/// # Example
///
/// ```toml
/// penalty_duration_ms = 30000
/// max_batch_size = 10000
/// # content_directory = "/var/lib/flowfile/content"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long a penalized record stays unavailable to `get`.
    #[serde(default = "default_penalty_duration_ms")]
    pub penalty_duration_ms: u64,
    /// On-disk content root; in-memory content when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_directory: Option<PathBuf>,
    /// Upper bound for `get_batch`.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            penalty_duration_ms: default_penalty_duration_ms(),
            content_directory: None,
            max_batch_size: default_max_batch_size(),
        }
    }
}

impl SessionConfig {
    /// Penalty as a `chrono::Duration`
    pub fn penalty_duration(&self) -> Duration {
        Duration::milliseconds(i64::try_from(self.penalty_duration_ms).unwrap_or(i64::MAX))
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# FlowFile session configuration
#
# How long (milliseconds) a penalized record stays unavailable to get()
# after penalize() or rollback(true).
penalty_duration_ms = 30000

# Upper bound for get_batch(n).
max_batch_size = 10000

# Directory for on-disk content. Content is kept in memory when unset.
# content_directory = "/var/lib/flowfile/content"
"#
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the text is not valid TOML for this
    /// structure or a value is out of range.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SessionConfig = toml::from_str(text)
            .map_err(|e| Error::Config(format!("Failed to parse session config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(Error::Config(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
