//! Measurement store configuration

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::error::{StorageError, StorageResult};

/// Storage backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// File-based storage (default)
    #[default]
    File,
    /// Memory storage (for testing)
    Memory,
}

/// Main store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage backend type
    #[serde(default)]
    pub backend: BackendType,

    /// Base directory of the file backend; defaults to the platform data dir
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// A lock older than this is considered abandoned and broken
    #[serde(with = "humantime_serde", default = "default_lock_ttl")]
    pub lock_ttl: Duration,

    /// How long a writer waits for the per-metric lock
    #[serde(with = "humantime_serde", default = "default_lock_timeout")]
    pub lock_timeout: Duration,

    /// Times a record operation re-reads the head after a conflict
    #[serde(default = "default_cas_retries")]
    pub cas_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            base_dir: None,
            lock_ttl: default_lock_ttl(),
            lock_timeout: default_lock_timeout(),
            cas_retries: default_cas_retries(),
        }
    }
}

fn default_lock_ttl() -> Duration {
    Duration::from_secs(30)
}

fn default_lock_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_cas_retries() -> u32 {
    5
}

impl StoreConfig {
    /// Configuration for an in-memory store
    pub fn memory() -> Self {
        Self {
            backend: BackendType::Memory,
            ..Self::default()
        }
    }

    /// Configuration for a file store rooted at `base_dir`
    pub fn file(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendType::File,
            base_dir: Some(base_dir.into()),
            ..Self::default()
        }
    }

    /// The directory the file backend writes to
    pub fn resolved_base_dir(&self) -> StorageResult<PathBuf> {
        if let Some(dir) = &self.base_dir {
            return Ok(dir.clone());
        }
        ProjectDirs::from("org", "quality-collector", "quality-collector")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| StorageError::configuration("Could not determine a data directory"))
    }
}
