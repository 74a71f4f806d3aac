//! Exclusive lock files serializing writers of one metric's log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::{StorageError, StorageResult};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Contents of a lock file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageLock {
    /// Unique lock key
    pub key: String,
    /// Lock holder identifier
    pub holder: String,
    /// When the lock was acquired
    pub acquired_at: DateTime<Utc>,
    /// Time to live for the lock
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Lock token for verification
    pub token: String,
}

impl StorageLock {
    pub fn new(key: impl Into<String>, holder: impl Into<String>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            holder: holder.into(),
            acquired_at: Utc::now(),
            ttl,
            token: Uuid::new_v4().to_string(),
        }
    }

    /// Check if the lock has expired
    pub fn is_expired(&self) -> bool {
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => Utc::now() > self.acquired_at + ttl,
            Err(_) => false,
        }
    }
}

/// Holds a lock file until [`FileLockGuard::release`].
///
/// Only the file carrying this guard's token is ever removed, so a holder
/// that outlived its ttl cannot delete the lock of the writer that broke it.
#[derive(Debug)]
pub struct FileLockGuard {
    lock: StorageLock,
    lock_file: PathBuf,
    released: bool,
}

impl FileLockGuard {
    /// Acquire the lock at `lock_file`, waiting up to `timeout`.
    ///
    /// Lock files left behind by a crashed writer are broken once their
    /// ttl has passed.
    pub async fn acquire(
        lock_file: &Path,
        key: &str,
        ttl: Duration,
        timeout: Duration,
    ) -> StorageResult<Self> {
        if let Some(parent) = lock_file.parent() {
            fs::create_dir_all(parent).await?;
        }
        let holder = format!("pid-{}", std::process::id());
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let lock = StorageLock::new(key, holder.as_str(), ttl);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(lock_file)
                .await
            {
                Ok(mut file) => {
                    let contents = serde_json::to_vec(&lock)?;
                    file.write_all(&contents).await?;
                    file.flush().await?;
                    debug!("Acquired lock {}", lock_file.display());
                    return Ok(Self {
                        lock,
                        lock_file: lock_file.to_path_buf(),
                        released: false,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if Self::break_if_stale(lock_file, ttl).await? {
                        continue;
                    }
                }
                Err(e) => {
                    return Err(StorageError::lock(format!(
                        "Failed to create {}: {}",
                        lock_file.display(),
                        e
                    )))
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(StorageError::Timeout(timeout));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Remove an abandoned lock file. Returns true when one was removed.
    async fn break_if_stale(lock_file: &Path, ttl: Duration) -> StorageResult<bool> {
        let stale = match fs::read(lock_file).await {
            Ok(contents) => match serde_json::from_slice::<StorageLock>(&contents) {
                Ok(existing) => existing.is_expired(),
                // A holder may be between create and write; judge by age instead
                Err(_) => Self::older_than(lock_file, ttl).await,
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };

        if !stale {
            return Ok(false);
        }
        warn!("Breaking stale lock {}", lock_file.display());
        match fs::remove_file(lock_file).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    async fn older_than(path: &Path, age: Duration) -> bool {
        fs::metadata(path)
            .await
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|elapsed| elapsed > age)
    }

    /// Get the lock information
    pub fn lock_info(&self) -> &StorageLock {
        &self.lock
    }

    /// Release the lock, leaving the file alone if another writer has
    /// since broken it and taken over
    pub async fn release(mut self) -> StorageResult<()> {
        self.released = true;
        let contents = match fs::read(&self.lock_file).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Lock {} vanished before release", self.lock_file.display());
                return Ok(());
            }
            Err(e) => return Err(StorageError::lock(format!("Failed to release lock: {}", e))),
        };

        if !self.holds(&contents) {
            warn!(
                "Lock {} was taken over after its ttl; leaving it to the new holder",
                self.lock_file.display()
            );
            return Ok(());
        }
        match fs::remove_file(&self.lock_file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::lock(format!("Failed to release lock: {}", e))),
        }
    }

    fn holds(&self, contents: &[u8]) -> bool {
        serde_json::from_slice::<StorageLock>(contents)
            .is_ok_and(|current| current.token == self.lock.token)
    }
}

impl Drop for FileLockGuard {
    // Reached only when the owning future was cancelled or panicked
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!("Lock {} dropped without release", self.lock_file.display());
        if std::fs::read(&self.lock_file).is_ok_and(|contents| self.holds(&contents)) {
            let _ = std::fs::remove_file(&self.lock_file);
        }
    }
}
