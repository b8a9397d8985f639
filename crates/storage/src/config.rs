//! Storage configuration, loaded from TOML.
//!
//! ```toml
//! path = "featureboard.db"
//! busy_timeout_ms = 5000
//!
//! [seed]
//! clients = ["Client A", "Client B", "Client C"]
//! product_areas = ["Policies", "Billing", "Claims", "Reports"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::StorageError;

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Database file. `None` opens an in-memory database.
    pub path: Option<PathBuf>,
    /// How long a writer waits for the database lock before failing.
    pub busy_timeout_ms: u64,
    pub seed: SeedConfig,
}

/// Reference data inserted by `seed_default_data`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedConfig {
    pub clients: Vec<String>,
    pub product_areas: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            seed: SeedConfig::default(),
        }
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            clients: ["Client A", "Client B", "Client C"]
                .into_iter()
                .map(String::from)
                .collect(),
            product_areas: ["Policies", "Billing", "Claims", "Reports"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, StorageError> {
        toml::from_str(s).map_err(|e| StorageError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| StorageError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
