use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use super::CommandContext;
use crate::adapters::builtin_registry;
use crate::collector::{FetchOrchestrator, ReqwestFetcher};
use crate::error::QualityError;
use crate::model::Metric;
use crate::pipeline::{Collector, CycleOutcome};

/// Collect the selected metrics (all when `selected` is empty)
pub async fn run_collect(context: CommandContext, selected: &[String]) -> Result<()> {
    let metrics = select(&context.settings.metrics, selected)?;
    let config = context.settings.collector.clone();
    let fetcher = ReqwestFetcher::new(config.request_timeout, &config.user_agent)
        .map_err(QualityError::from)?;
    let orchestrator =
        FetchOrchestrator::new(Arc::new(builtin_registry()), Arc::new(fetcher), config);
    let collector = Collector::new(orchestrator, context.log);

    let outcomes = collector.collect_all(&metrics).await;

    let mut out = std::io::stdout().lock();
    let mut failed = 0;
    for (metric_id, outcome) in outcomes {
        match outcome {
            Ok(outcome) => writeln!(out, "{}", summary_line(&outcome))?,
            Err(e) => {
                failed += 1;
                writeln!(out, "{metric_id}: not recorded ({e})")?;
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{failed} metric(s) could not be recorded"));
    }
    Ok(())
}

fn select(
    metrics: &BTreeMap<String, Metric>,
    selected: &[String],
) -> Result<BTreeMap<String, Metric>, QualityError> {
    if selected.is_empty() {
        return Ok(metrics.clone());
    }
    selected
        .iter()
        .map(|id| {
            metrics
                .get(id)
                .map(|metric| (id.clone(), metric.clone()))
                .ok_or_else(|| crate::error::common::unknown_metric(id))
        })
        .collect()
}

fn summary_line(outcome: &CycleOutcome) -> String {
    let mut line = format!(
        "{}: {} (value {})",
        outcome.metric_id,
        outcome.status(),
        outcome.value().unwrap_or("?")
    );
    if !outcome.appended {
        line.push_str(", unchanged");
    }
    for source in &outcome.measurement.sources {
        if let Some(error) = source
            .connection_error
            .as_deref()
            .or(source.parse_error.as_deref())
        {
            line.push_str(&format!("\n  {}: {}", source.source_id, error));
        }
    }
    for warning in &outcome.warnings {
        line.push_str(&format!("\n  warning {warning}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MetricBuilder;

    #[test]
    fn test_select_unknown_metric() {
        let mut metrics = BTreeMap::new();
        metrics.insert("a".to_string(), MetricBuilder::new().build());

        assert_eq!(select(&metrics, &[]).unwrap().len(), 1);
        assert_eq!(select(&metrics, &["a".to_string()]).unwrap().len(), 1);
        let err = select(&metrics, &["b".to_string()]).unwrap_err();
        assert!(err.to_string().contains("'b'"));
    }
}
