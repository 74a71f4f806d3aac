//! File-based measurement store
//!
//! Layout per metric:
//!
//! ```text
//! <base>/measurements/<metric>/head.json         current head, last = true
//! <base>/measurements/<metric>/history/<id>.json retired heads, last = false
//! <base>/measurements/<metric>/.lock             held while writing
//! ```
//!
//! Every document is written to a temporary file and renamed into place, so
//! readers see whole documents without taking the lock. An append writes
//! the retired copy first and swaps `head.json` second; a reader racing the
//! append sees the retired copy and the old head under the same id, and the
//! head wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::model::Measurement;
use crate::storage::{
    config::StoreConfig,
    error::{StorageError, StorageResult},
    lock::FileLockGuard,
    traits::MeasurementStore,
};

const HEAD_FILE: &str = "head.json";
const HISTORY_DIR: &str = "history";
const LOCK_FILE: &str = ".lock";
const HISTORY_READ_ATTEMPTS: usize = 64;

/// File-based measurement store
#[derive(Debug, Clone)]
pub struct FileBackend {
    base_dir: PathBuf,
    lock_ttl: Duration,
    lock_timeout: Duration,
}

impl FileBackend {
    /// Create a new file backend
    pub async fn new(config: &StoreConfig) -> StorageResult<Self> {
        let base_dir = config.resolved_base_dir()?;
        fs::create_dir_all(base_dir.join("measurements")).await?;

        Ok(Self {
            base_dir,
            lock_ttl: config.lock_ttl,
            lock_timeout: config.lock_timeout,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn metric_dir(&self, metric_id: &str) -> PathBuf {
        self.base_dir
            .join("measurements")
            .join(encode_component(metric_id))
    }

    async fn lock(&self, metric_id: &str) -> StorageResult<FileLockGuard> {
        let lock_file = self.metric_dir(metric_id).join(LOCK_FILE);
        FileLockGuard::acquire(&lock_file, metric_id, self.lock_ttl, self.lock_timeout).await
    }

    async fn read_head(&self, metric_id: &str) -> StorageResult<Option<Measurement>> {
        read_json(&self.metric_dir(metric_id).join(HEAD_FILE)).await
    }

    async fn read_retired(&self, metric_id: &str) -> StorageResult<Vec<Measurement>> {
        let mut entries = match fs::read_dir(self.metric_dir(metric_id).join(HISTORY_DIR)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut retired = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(measurement) = read_json::<Measurement>(&path).await? {
                retired.push(measurement);
            }
        }
        Ok(retired)
    }

    fn verify_expected(
        metric_id: &str,
        current: Option<&Measurement>,
        expected: Option<Uuid>,
    ) -> StorageResult<()> {
        let current_id = current.map(|m| m.id);
        if current_id == expected {
            return Ok(());
        }
        Err(StorageError::conflict(format!(
            "head of '{}' is {} but the writer expected {}",
            metric_id,
            current_id.map_or("absent".to_string(), |id| id.to_string()),
            expected.map_or("absent".to_string(), |id| id.to_string()),
        )))
    }
}

/// Map a metric id onto a single, reversible path component
fn encode_component(id: &str) -> String {
    let mut encoded = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    match fs::read(path).await {
        Ok(content) => Ok(Some(serde_json::from_slice(&content).map_err(|e| {
            StorageError::serialization(format!("{}: {}", path.display(), e))
        })?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::Io(e)),
    }
}

/// Write JSON to a sibling temporary file and rename it over `path`
async fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> StorageResult<()> {
    let parent = path
        .parent()
        .ok_or_else(|| StorageError::configuration(format!("{} has no parent", path.display())))?;
    fs::create_dir_all(parent).await?;

    let tmp = parent.join(format!(".{}.tmp", Uuid::new_v4()));
    let content = serde_json::to_vec_pretty(data)?;
    let mut file = fs::File::create(&tmp).await?;
    file.write_all(&content).await?;
    file.sync_all().await?;
    drop(file);

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(StorageError::Io(e));
    }
    Ok(())
}

#[async_trait]
impl MeasurementStore for FileBackend {
    async fn head(&self, metric_id: &str) -> StorageResult<Option<Measurement>> {
        self.read_head(metric_id).await
    }

    async fn history(&self, metric_id: &str) -> StorageResult<Vec<Measurement>> {
        // An append finishing mid-listing would leave a gap; list again
        // until the head is the same before and after
        for _ in 0..HISTORY_READ_ATTEMPTS {
            let before = self.read_head(metric_id).await?;
            let retired = self.read_retired(metric_id).await?;
            let after = self.read_head(metric_id).await?;
            if before.as_ref().map(|m| m.id) != after.as_ref().map(|m| m.id) {
                continue;
            }

            let mut by_id: HashMap<Uuid, Measurement> =
                retired.into_iter().map(|m| (m.id, m)).collect();
            if let Some(head) = after {
                by_id.insert(head.id, head);
            }
            let mut history: Vec<Measurement> = by_id.into_values().collect();
            history.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
            return Ok(history);
        }

        Err(StorageError::conflict(format!(
            "head of '{}' kept moving while its history was read",
            metric_id
        )))
    }

    async fn extend_head(
        &self,
        metric_id: &str,
        expected: Uuid,
        end: DateTime<Utc>,
    ) -> StorageResult<Measurement> {
        let guard = self.lock(metric_id).await?;
        let written = async {
            let current = self.read_head(metric_id).await?;
            Self::verify_expected(metric_id, current.as_ref(), Some(expected))?;

            let mut head = current.ok_or_else(|| StorageError::not_found(metric_id))?;
            head.end = end;
            write_json_atomic(&self.metric_dir(metric_id).join(HEAD_FILE), &head).await?;
            Ok::<_, StorageError>(head)
        }
        .await;
        guard.release().await?;

        let head = written?;
        debug!("Extended head {} of '{}' to {}", head.id, metric_id, end);
        Ok(head)
    }

    async fn append_head(
        &self,
        metric_id: &str,
        expected: Option<Uuid>,
        mut next: Measurement,
    ) -> StorageResult<Measurement> {
        let guard = self.lock(metric_id).await?;
        let dir = self.metric_dir(metric_id);
        let written = async {
            let current = self.read_head(metric_id).await?;
            Self::verify_expected(metric_id, current.as_ref(), expected)?;

            if let Some(mut retired) = current {
                retired.last = false;
                let path = dir.join(HISTORY_DIR).join(format!("{}.json", retired.id));
                write_json_atomic(&path, &retired).await?;
            }
            next.last = true;
            write_json_atomic(&dir.join(HEAD_FILE), &next).await?;
            Ok::<_, StorageError>(())
        }
        .await;
        guard.release().await?;

        written?;
        debug!("Appended head {} to '{}'", next.id, metric_id);
        Ok(next)
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Scale, ScaleMeasurement};
    use tempfile::TempDir;

    fn measurement(metric_id: &str, start: DateTime<Utc>) -> Measurement {
        Measurement::new(metric_id, vec![], Scale::Count, ScaleMeasurement::default(), start)
    }

    async fn backend(dir: &TempDir) -> FileBackend {
        FileBackend::new(&StoreConfig::file(dir.path())).await.unwrap()
    }

    #[test]
    fn test_encode_component() {
        assert_eq!(encode_component("violations-1"), "violations-1");
        assert_eq!(encode_component("a/b"), "a%2Fb");
        assert_eq!(encode_component(".."), "%2E%2E");
    }

    #[tokio::test]
    async fn test_append_and_history_order() {
        let dir = TempDir::new().unwrap();
        let store = backend(&dir).await;
        let t0 = Utc::now();

        let first = store
            .append_head("m/1", None, measurement("m/1", t0))
            .await
            .unwrap();
        let second = store
            .append_head(
                "m/1",
                Some(first.id),
                measurement("m/1", t0 + chrono::Duration::minutes(1)),
            )
            .await
            .unwrap();

        let history = store.history("m/1").await.unwrap();
        assert_eq!(
            history.iter().map(|m| (m.id, m.last)).collect::<Vec<_>>(),
            vec![(first.id, false), (second.id, true)]
        );
        assert!(!dir.path().join("measurements/m%2F1/.lock").exists());
    }

    #[tokio::test]
    async fn test_conflict_across_instances() {
        let dir = TempDir::new().unwrap();
        let writer_a = backend(&dir).await;
        let writer_b = backend(&dir).await;
        let t0 = Utc::now();

        let first = writer_a
            .append_head("m", None, measurement("m", t0))
            .await
            .unwrap();
        let seen_by_b = writer_b.head("m").await.unwrap().unwrap();
        assert_eq!(seen_by_b.id, first.id);

        writer_a
            .append_head("m", Some(first.id), measurement("m", t0))
            .await
            .unwrap();

        let err = writer_b
            .append_head("m", Some(seen_by_b.id), measurement("m", t0))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(writer_b.history("m").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_extend_rewrites_head_in_place() {
        let dir = TempDir::new().unwrap();
        let store = backend(&dir).await;
        let t0 = Utc::now();
        let first = store.append_head("m", None, measurement("m", t0)).await.unwrap();

        let later = t0 + chrono::Duration::hours(1);
        store.extend_head("m", first.id, later).await.unwrap();

        let reopened = backend(&dir).await;
        let head = reopened.head("m").await.unwrap().unwrap();
        assert_eq!(head.id, first.id);
        assert_eq!(head.end, later);
        assert_eq!(reopened.history("m").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_half_finished_append_reads_consistently() {
        let dir = TempDir::new().unwrap();
        let store = backend(&dir).await;
        let first = store
            .append_head("m", None, measurement("m", Utc::now()))
            .await
            .unwrap();

        // Retired copy written, head swap not yet done
        let mut retired = first.clone();
        retired.last = false;
        write_json_atomic(
            &store
                .metric_dir("m")
                .join(HISTORY_DIR)
                .join(format!("{}.json", first.id)),
            &retired,
        )
        .await
        .unwrap();

        let history = store.history("m").await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].last);
    }
}
