//! One collection cycle: fetch, carry annotations forward, aggregate,
//! evaluate and log.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::BTreeMap;
use tracing::info;

use crate::collector::FetchOrchestrator;
use crate::measurement_log::{LogResult, MeasurementLog};
use crate::model::{Measurement, Metric, SourceResult};
use crate::status::Status;

/// Result of collecting one metric
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub metric_id: String,
    pub measurement: Measurement,
    /// Whether the cycle appended a new head (as opposed to extending it)
    pub appended: bool,
    /// Soft warnings raised by the sources, prefixed with the source id
    pub warnings: Vec<String>,
}

impl CycleOutcome {
    pub fn status(&self) -> Status {
        self.measurement.status()
    }

    /// Aggregated value, if the metric has one
    pub fn value(&self) -> Option<&str> {
        self.measurement
            .aggregate()
            .and_then(|(_, block)| block.value.as_deref())
    }
}

/// Drives collection cycles from fetching to the measurement log
pub struct Collector {
    orchestrator: FetchOrchestrator,
    log: MeasurementLog,
}

impl Collector {
    pub fn new(orchestrator: FetchOrchestrator, log: MeasurementLog) -> Self {
        Self { orchestrator, log }
    }

    pub fn log(&self) -> &MeasurementLog {
        &self.log
    }

    /// Run one cycle for `metric`
    pub async fn collect(&self, metric_id: &str, metric: &Metric) -> LogResult<CycleOutcome> {
        let sources = self.orchestrator.fetch_metric(metric).await;
        self.record(metric_id, metric, sources, Utc::now()).await
    }

    /// Run one cycle for each metric concurrently; requests of all metrics
    /// share the orchestrator's request pool
    pub async fn collect_all(
        &self,
        metrics: &BTreeMap<String, Metric>,
    ) -> Vec<(String, LogResult<CycleOutcome>)> {
        join_all(metrics.iter().map(|(metric_id, metric)| async move {
            (metric_id.clone(), self.collect(metric_id, metric).await)
        }))
        .await
    }

    async fn record(
        &self,
        metric_id: &str,
        metric: &Metric,
        sources: Vec<SourceResult>,
        now: DateTime<Utc>,
    ) -> LogResult<CycleOutcome> {
        let warnings: Vec<String> = sources
            .iter()
            .flat_map(|s| {
                s.warnings
                    .iter()
                    .map(move |w| format!("{}: {}", s.source_id, w))
            })
            .collect();

        let outcome = self.log.record(metric_id, metric, sources, now).await?;
        let appended = outcome.appended();
        let measurement = outcome.into_measurement();
        info!(
            "Collected '{}': status {} ({})",
            metric_id,
            measurement.status(),
            if appended { "new measurement" } else { "unchanged" }
        );

        Ok(CycleOutcome {
            metric_id: metric_id.to_string(),
            measurement,
            appended,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectorConfig;
    use crate::storage::MemoryBackend;
    use crate::testing::{test_registry, Fixtures, MetricBuilder, StubFetcher, StubReply};
    use std::sync::Arc;

    const ONE: &str = "https://ci.example.org/one.json";
    const TWO: &str = "https://ci.example.org/two.json";

    fn collector(fetcher: Arc<StubFetcher>) -> Collector {
        let orchestrator = FetchOrchestrator::new(
            Arc::new(test_registry()),
            fetcher,
            CollectorConfig::default(),
        );
        Collector::new(
            orchestrator,
            MeasurementLog::new(Arc::new(MemoryBackend::new()), 3),
        )
    }

    fn metric() -> Metric {
        MetricBuilder::new()
            .with_source(Fixtures::value_source("s1", ONE))
            .with_source(Fixtures::value_source("s2", TWO))
            .build()
    }

    #[tokio::test]
    async fn test_cycle_sums_sources_and_reports_status() {
        let fetcher = Arc::new(StubFetcher::new());
        fetcher.set_default(ONE, StubReply::json(200, &Fixtures::value_document("3", "10")));
        fetcher.set_default(TWO, StubReply::json(200, &Fixtures::value_document("4", "10")));
        let collector = collector(fetcher);

        let outcome = collector.collect("m", &metric()).await.unwrap();
        assert!(outcome.appended);
        assert_eq!(outcome.value(), Some("7"));
        assert_eq!(
            outcome.measurement.count.as_ref().unwrap().total.as_deref(),
            Some("20")
        );
        assert_eq!(outcome.status(), Status::TargetMet);
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_collect_all_keeps_metrics_apart() {
        let fetcher = Arc::new(StubFetcher::new());
        fetcher.set_default(ONE, StubReply::json(200, &Fixtures::value_document("3", "10")));
        fetcher.set_default(TWO, StubReply::status(500, "down"));
        let collector = collector(fetcher);

        let mut metrics = BTreeMap::new();
        metrics.insert(
            "only-one".to_string(),
            MetricBuilder::new()
                .with_source(Fixtures::value_source("s1", ONE))
                .build(),
        );
        metrics.insert(
            "only-two".to_string(),
            MetricBuilder::new()
                .with_source(Fixtures::value_source("s2", TWO))
                .build(),
        );

        let outcomes = collector.collect_all(&metrics).await;
        assert_eq!(outcomes.len(), 2);
        let (id, first) = &outcomes[0];
        assert_eq!(id, "only-one");
        assert_eq!(first.as_ref().unwrap().value(), Some("3"));
        let (_, second) = &outcomes[1];
        let second = second.as_ref().unwrap();
        assert_eq!(second.status(), Status::Unknown);
        assert!(second.measurement.sources[0].connection_error.is_some());
    }
}
