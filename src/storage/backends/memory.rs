//! In-memory measurement store for tests and dry runs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::model::Measurement;
use crate::storage::{
    error::{StorageError, StorageResult},
    traits::MeasurementStore,
};

/// In-memory measurement store
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    logs: Arc<RwLock<HashMap<String, Vec<Measurement>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn head_of(log: &[Measurement]) -> Option<&Measurement> {
    log.iter().rev().find(|m| m.last)
}

fn check_expected(
    metric_id: &str,
    current: Option<Uuid>,
    expected: Option<Uuid>,
) -> StorageResult<()> {
    if current == expected {
        return Ok(());
    }
    Err(StorageError::conflict(format!(
        "head of '{}' is {} but the writer expected {}",
        metric_id,
        current.map_or("absent".to_string(), |id| id.to_string()),
        expected.map_or("absent".to_string(), |id| id.to_string()),
    )))
}

#[async_trait]
impl MeasurementStore for MemoryBackend {
    async fn head(&self, metric_id: &str) -> StorageResult<Option<Measurement>> {
        let logs = self.logs.read().await;
        Ok(logs
            .get(metric_id)
            .and_then(|log| head_of(log))
            .cloned())
    }

    async fn history(&self, metric_id: &str) -> StorageResult<Vec<Measurement>> {
        let logs = self.logs.read().await;
        Ok(logs.get(metric_id).cloned().unwrap_or_default())
    }

    async fn extend_head(
        &self,
        metric_id: &str,
        expected: Uuid,
        end: DateTime<Utc>,
    ) -> StorageResult<Measurement> {
        let mut logs = self.logs.write().await;
        let log = logs.entry(metric_id.to_string()).or_default();
        let current = head_of(log).map(|m| m.id);
        check_expected(metric_id, current, Some(expected))?;

        let head = log
            .iter_mut()
            .rev()
            .find(|m| m.last)
            .ok_or_else(|| StorageError::not_found(metric_id))?;
        head.end = end;
        Ok(head.clone())
    }

    async fn append_head(
        &self,
        metric_id: &str,
        expected: Option<Uuid>,
        mut next: Measurement,
    ) -> StorageResult<Measurement> {
        let mut logs = self.logs.write().await;
        let log = logs.entry(metric_id.to_string()).or_default();
        let current = head_of(log).map(|m| m.id);
        check_expected(metric_id, current, expected)?;

        for retired in log.iter_mut() {
            retired.last = false;
        }
        next.last = true;
        log.push(next.clone());
        Ok(next)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Scale, ScaleMeasurement};

    fn measurement(metric_id: &str) -> Measurement {
        Measurement::new(metric_id, vec![], Scale::Count, ScaleMeasurement::default(), Utc::now())
    }

    #[tokio::test]
    async fn test_append_retires_previous_head() {
        let store = MemoryBackend::new();
        let first = store.append_head("m", None, measurement("m")).await.unwrap();
        let second = store
            .append_head("m", Some(first.id), measurement("m"))
            .await
            .unwrap();

        let history = store.history("m").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history[0].last);
        assert!(history[1].last);
        assert_eq!(store.head("m").await.unwrap().unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_stale_expectation_is_a_conflict() {
        let store = MemoryBackend::new();
        let first = store.append_head("m", None, measurement("m")).await.unwrap();
        store
            .append_head("m", Some(first.id), measurement("m"))
            .await
            .unwrap();

        let err = store
            .append_head("m", Some(first.id), measurement("m"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let err = store
            .extend_head("m", first.id, Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let err = store.append_head("m", None, measurement("m")).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_extend_moves_end_only() {
        let store = MemoryBackend::new();
        let first = store.append_head("m", None, measurement("m")).await.unwrap();
        let later = first.end + chrono::Duration::minutes(10);

        let extended = store.extend_head("m", first.id, later).await.unwrap();
        assert_eq!(extended.id, first.id);
        assert_eq!(extended.start, first.start);
        assert_eq!(extended.end, later);
        assert_eq!(store.history("m").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_metric_is_empty() {
        let store = MemoryBackend::new();
        assert!(store.head("nope").await.unwrap().is_none());
        assert!(store.history("nope").await.unwrap().is_empty());
    }
}
