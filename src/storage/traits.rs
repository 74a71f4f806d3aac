//! The persistence boundary of the measurement log

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::StorageResult;
use crate::model::Measurement;

/// Document store for per-metric measurement logs.
///
/// Writes are compare-and-swap on the head id: a writer names the head it
/// read, and the store rejects the write with a conflict if another writer
/// moved the head in the meantime. Reads never block on writers.
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// The current head (`last = true`) of a metric, if any
    async fn head(&self, metric_id: &str) -> StorageResult<Option<Measurement>>;

    /// Every measurement of a metric, ordered by start
    async fn history(&self, metric_id: &str) -> StorageResult<Vec<Measurement>>;

    /// Advance the head's `end` to `end` if the head is still `expected`
    async fn extend_head(
        &self,
        metric_id: &str,
        expected: Uuid,
        end: DateTime<Utc>,
    ) -> StorageResult<Measurement>;

    /// Retire the head `expected` (None: the log must be empty) and make
    /// `next` the new head
    async fn append_head(
        &self,
        metric_id: &str,
        expected: Option<Uuid>,
        next: Measurement,
    ) -> StorageResult<Measurement>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}
