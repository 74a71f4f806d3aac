//! The per-metric measurement log
//!
//! A collection cycle either extends the head (nothing material changed) or
//! appends a new head and retires the previous one. Every write names the
//! head it was derived from; when another writer got there first the whole
//! operation is recomputed from the new head, a bounded number of times.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregation::aggregate;
use crate::error::{ErrorCode, QualityError};
use crate::model::{EntityAnnotation, Measurement, Metric, ScaleMeasurement, SourceResult};
use crate::status::{evaluate, status_start};
use crate::storage::{MeasurementStore, StorageError};

pub type LogResult<T> = Result<T, LogError>;

#[derive(Error, Debug)]
pub enum LogError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("measurements of '{metric_id}' kept changing; gave up after {attempts} attempts")]
    Contention { metric_id: String, attempts: u32 },

    #[error("metric '{0}' has no measurements yet")]
    NoHead(String),

    #[error("source '{source_id}' is not part of the latest measurement of '{metric_id}'")]
    UnknownSource {
        metric_id: String,
        source_id: String,
    },

    #[error("entity '{entity_key}' is not reported by source '{source_id}'")]
    UnknownEntity {
        source_id: String,
        entity_key: String,
    },
}

impl From<LogError> for QualityError {
    fn from(err: LogError) -> Self {
        let (code, metric_id) = match &err {
            LogError::Storage(_) => (ErrorCode::LOG_GENERIC, None),
            LogError::Contention { metric_id, .. } => {
                (ErrorCode::LOG_CONTENTION, Some(metric_id.clone()))
            }
            LogError::NoHead(metric_id) => (ErrorCode::LOG_NO_HEAD, Some(metric_id.clone())),
            LogError::UnknownSource { metric_id, .. } => {
                (ErrorCode::LOG_UNKNOWN_SOURCE, Some(metric_id.clone()))
            }
            LogError::UnknownEntity { .. } => (ErrorCode::LOG_UNKNOWN_ENTITY, None),
        };
        match err {
            LogError::Storage(storage) => storage.into(),
            other => QualityError::log_with_code(code, other.to_string(), metric_id),
        }
    }
}

/// What a write did to the log
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// The head's `end` advanced
    Extended(Measurement),
    /// A new head was appended
    Appended(Measurement),
    /// Nothing needed writing
    Unchanged(Measurement),
}

impl RecordOutcome {
    pub fn measurement(&self) -> &Measurement {
        match self {
            Self::Extended(m) | Self::Appended(m) | Self::Unchanged(m) => m,
        }
    }

    pub fn into_measurement(self) -> Measurement {
        match self {
            Self::Extended(m) | Self::Appended(m) | Self::Unchanged(m) => m,
        }
    }

    pub fn appended(&self) -> bool {
        matches!(self, Self::Appended(_))
    }
}

/// Measurement log over a [`MeasurementStore`]
#[derive(Clone)]
pub struct MeasurementLog {
    store: Arc<dyn MeasurementStore>,
    cas_retries: u32,
}

impl MeasurementLog {
    pub fn new(store: Arc<dyn MeasurementStore>, cas_retries: u32) -> Self {
        Self { store, cas_retries }
    }

    pub fn store(&self) -> &Arc<dyn MeasurementStore> {
        &self.store
    }

    /// Record the results of one collection cycle
    pub async fn record(
        &self,
        metric_id: &str,
        metric: &Metric,
        sources: Vec<SourceResult>,
        now: DateTime<Utc>,
    ) -> LogResult<RecordOutcome> {
        self.with_cas(metric_id, |head| {
            let sources = carry_forward(head.as_ref(), sources.clone());
            let candidate = assemble(metric_id, metric, sources, head.as_ref(), now);
            Ok(match head {
                Some(head) if head.same_content(&candidate) => Write::Extend(head.id, now),
                head => Write::Append(head.map(|h| h.id), candidate),
            })
        })
        .await
    }

    /// Attach `annotation` to one entity of the head and append the result
    pub async fn annotate(
        &self,
        metric_id: &str,
        metric: &Metric,
        source_id: &str,
        entity_key: &str,
        mut annotation: EntityAnnotation,
        now: DateTime<Utc>,
    ) -> LogResult<RecordOutcome> {
        annotation.updated_at = Some(now);
        self.with_cas(metric_id, |head| {
            let head = head.ok_or_else(|| LogError::NoHead(metric_id.to_string()))?;
            let mut sources = head.sources.clone();
            let source = sources
                .iter_mut()
                .find(|s| s.source_id == source_id)
                .ok_or_else(|| LogError::UnknownSource {
                    metric_id: metric_id.to_string(),
                    source_id: source_id.to_string(),
                })?;
            if !source.entities.iter().any(|e| e.key == entity_key) {
                return Err(LogError::UnknownEntity {
                    source_id: source_id.to_string(),
                    entity_key: entity_key.to_string(),
                });
            }
            source
                .entity_user_data
                .insert(entity_key.to_string(), annotation.clone());

            let next = assemble(metric_id, metric, sources, Some(&head), now);
            Ok(Write::Append(Some(head.id), next))
        })
        .await
    }

    /// Re-run status evaluation on the head after a policy edit
    pub async fn reevaluate(
        &self,
        metric_id: &str,
        metric: &Metric,
        now: DateTime<Utc>,
    ) -> LogResult<RecordOutcome> {
        self.with_cas(metric_id, |head| {
            let head = head.ok_or_else(|| LogError::NoHead(metric_id.to_string()))?;
            let next = assemble(metric_id, metric, head.sources.clone(), Some(&head), now);
            if head.same_content(&next) {
                return Ok(Write::Nothing(head));
            }
            Ok(Write::Append(Some(head.id), next))
        })
        .await
    }

    /// Every measurement of a metric, oldest first
    pub async fn history(&self, metric_id: &str) -> LogResult<Vec<Measurement>> {
        Ok(self.store.history(metric_id).await?)
    }

    pub async fn head(&self, metric_id: &str) -> LogResult<Option<Measurement>> {
        Ok(self.store.head(metric_id).await?)
    }

    /// Read the head, derive a write from it and apply that write,
    /// starting over whenever the head moved underneath
    async fn with_cas<F>(&self, metric_id: &str, plan: F) -> LogResult<RecordOutcome>
    where
        F: Fn(Option<Measurement>) -> LogResult<Write>,
    {
        let attempts = self.cas_retries + 1;
        for attempt in 1..=attempts {
            let head = self.store.head(metric_id).await?;
            let write = plan(head)?;
            let result = self.apply(metric_id, write).await;

            match result {
                Ok(outcome) => {
                    match &outcome {
                        RecordOutcome::Appended(m) => {
                            info!("Appended measurement {} to '{}'", m.id, metric_id)
                        }
                        RecordOutcome::Extended(m) => {
                            debug!("Extended measurement {} of '{}'", m.id, metric_id)
                        }
                        RecordOutcome::Unchanged(_) => {}
                    }
                    return Ok(outcome);
                }
                Err(StorageError::Conflict(reason)) if attempt < attempts => {
                    warn!(
                        "Head of '{}' moved (attempt {}/{}): {}; retrying",
                        metric_id, attempt, attempts, reason
                    );
                }
                Err(StorageError::Conflict(_)) => break,
                Err(e) => return Err(e.into()),
            }
        }

        Err(LogError::Contention {
            metric_id: metric_id.to_string(),
            attempts,
        })
    }

    async fn apply(&self, metric_id: &str, write: Write) -> Result<RecordOutcome, StorageError> {
        match write {
            Write::Extend(expected, end) => self
                .store
                .extend_head(metric_id, expected, end)
                .await
                .map(RecordOutcome::Extended),
            Write::Append(expected, next) => self
                .store
                .append_head(metric_id, expected, next)
                .await
                .map(RecordOutcome::Appended),
            Write::Nothing(head) => Ok(RecordOutcome::Unchanged(head)),
        }
    }
}

enum Write {
    Extend(Uuid, DateTime<Utc>),
    Append(Option<Uuid>, Measurement),
    Nothing(Measurement),
}

/// Copy user annotations from the head onto entities that are still
/// reported under the same key. Annotations of vanished entities are dropped.
pub fn carry_forward(
    head: Option<&Measurement>,
    mut sources: Vec<SourceResult>,
) -> Vec<SourceResult> {
    let Some(head) = head else {
        return sources;
    };
    for source in &mut sources {
        let Some(previous) = head.source(&source.source_id) else {
            continue;
        };
        for entity in &source.entities {
            if let Some(annotation) = previous.entity_user_data.get(&entity.key) {
                source
                    .entity_user_data
                    .insert(entity.key.clone(), annotation.clone());
            }
        }
    }
    sources
}

/// Aggregate and evaluate `sources` into a fresh head candidate
pub fn assemble(
    metric_id: &str,
    metric: &Metric,
    sources: Vec<SourceResult>,
    previous: Option<&Measurement>,
    now: DateTime<Utc>,
) -> Measurement {
    let combined = aggregate(&sources, metric.scale, metric.addition, metric.direction);
    let status = evaluate(
        combined.value.as_deref(),
        &metric.status_policy(),
        now.date_naive(),
    );
    let previous_block = previous
        .and_then(|m| m.aggregate())
        .filter(|(scale, _)| *scale == metric.scale)
        .map(|(_, block)| block);

    let block = ScaleMeasurement {
        value: combined.value,
        total: combined.total,
        status,
        status_start: status_start(previous_block, status, now),
    };
    Measurement::new(metric_id, sources, metric.scale, block, now)
}
