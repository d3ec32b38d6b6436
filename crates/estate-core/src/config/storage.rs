//! Credential persistence configuration.

use serde::{Deserialize, Serialize};

/// Which key/value backend holds the persisted credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-local map; lost on restart.
    #[default]
    Memory,
    /// JSON file on disk; survives restarts.
    File,
}

/// Credential persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: StorageBackend,
    /// File path used by the `file` backend.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_path(),
        }
    }
}

fn default_path() -> String {
    "data/console-session.json".to_string()
}
