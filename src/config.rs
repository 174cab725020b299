//! Configuration Management
//!
//! Handles persistent configuration storage for importsync.

use crate::dispatch::Dialect;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Documentation host serving the provider's per-resource markdown pages
pub const DEFAULT_DOCS_BASE_URL: &str =
    "https://raw.githubusercontent.com/hashicorp/terraform-provider-aws/main/website/docs/r";

/// Remote rate limits require at least this much time between fetches
pub const MIN_FETCH_DELAY: Duration = Duration::from_millis(300);

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resource catalog, one resource type per line
    pub catalog_path: PathBuf,
    /// Source file holding the import-ID dispatch table
    pub dispatch_path: PathBuf,
    /// Base URL for resource documentation pages
    pub docs_base_url: String,
    /// Prefix stripped from resource types when building page names
    pub provider_prefix: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Delay after every documentation fetch
    pub fetch_delay_ms: u64,
    /// Markers used to locate the dispatch table
    pub dialect: Dialect,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("util/tf_resources.txt"),
            dispatch_path: PathBuf::from("js/mappings.js"),
            docs_base_url: DEFAULT_DOCS_BASE_URL.to_string(),
            provider_prefix: "aws_".to_string(),
            request_timeout_secs: 10,
            fetch_delay_ms: MIN_FETCH_DELAY.as_millis() as u64,
            dialect: Dialect::default(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("importsync").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unparseable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config {:?}", path))?;
        Ok(())
    }

    /// Write the default configuration to `path`. An existing file is kept
    /// unless `force` is set; returns whether anything was written.
    pub fn write_default(path: &Path, force: bool) -> Result<bool> {
        if path.exists() && !force {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Effective delay between fetches, never below [`MIN_FETCH_DELAY`]
    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms).max(MIN_FETCH_DELAY)
    }
}
