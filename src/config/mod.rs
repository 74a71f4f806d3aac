//! Configuration of the collector: fetch settings, the measurement store
//! and the metrics to collect.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

pub mod collector;
pub mod loader;

pub use collector::CollectorConfig;
pub use loader::ConfigLoader;

use crate::error::{common, ErrorCode, QualityError, Result};
use crate::model::{Metric, MetricValue};
use crate::storage::{BackendType, StoreConfig};

/// Overrides the store directory (and selects the file backend)
pub const STORE_DIR_ENV: &str = "QUALITY_COLLECTOR_STORE_DIR";
/// Overrides `collector.max_concurrent_requests`
pub const MAX_CONCURRENCY_ENV: &str = "QUALITY_COLLECTOR_MAX_CONCURRENCY";

/// Default configuration file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "quality-collector.yaml";

/// Get the per-user configuration directory
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("org", "quality-collector", "quality-collector")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Everything a collector process is configured with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub storage: StoreConfig,
    /// Metric id -> metric
    #[serde(default)]
    pub metrics: BTreeMap<String, Metric>,
}

impl AppSettings {
    /// Parse settings from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply the process environment on top of the file contents
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up by variable name
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup(STORE_DIR_ENV).filter(|d| !d.is_empty()) {
            self.storage.backend = BackendType::File;
            self.storage.base_dir = Some(PathBuf::from(dir));
        }

        if let Some(raw) = lookup(MAX_CONCURRENCY_ENV) {
            let value = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    QualityError::config_with_code(
                        ErrorCode::CONFIG_INVALID_VALUE,
                        format!("{MAX_CONCURRENCY_ENV} must be a positive integer, got '{raw}'"),
                    )
                })?;
            self.collector.max_concurrent_requests = value;
        }
        Ok(())
    }

    /// Look up a configured metric
    pub fn metric(&self, metric_id: &str) -> Result<&Metric> {
        self.metrics
            .get(metric_id)
            .ok_or_else(|| common::unknown_metric(metric_id))
    }

    /// Check what serde cannot: thresholds parse on the metric's scale and
    /// source ids are unique per metric
    pub fn validate(&self) -> Result<()> {
        if self.collector.max_concurrent_requests == 0 {
            return Err(QualityError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                "collector.max_concurrent_requests must be at least 1",
            ));
        }
        self.collector.retry.validate().map_err(|message| {
            QualityError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!("collector.retry: {message}"),
            )
        })?;

        for (metric_id, metric) in &self.metrics {
            let invalid = |message: String| {
                QualityError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("metric '{metric_id}': {message}"),
                )
            };

            let mut thresholds = vec![
                ("target", &metric.target),
                ("near_target", &metric.near_target),
            ];
            if let Some(debt_target) = &metric.debt_target {
                thresholds.push(("debt_target", debt_target));
            }
            for (name, raw) in thresholds {
                if MetricValue::parse(metric.scale, raw).is_none() {
                    return Err(invalid(format!(
                        "{name} '{raw}' is not a valid {} value",
                        metric.scale
                    )));
                }
            }
            if metric.accept_debt && metric.debt_target.is_none() {
                return Err(QualityError::config_with_code(
                    ErrorCode::CONFIG_MISSING_REQUIRED,
                    format!("metric '{metric_id}': accept_debt requires debt_target"),
                ));
            }

            let mut seen = HashSet::new();
            for source in &metric.sources {
                if !seen.insert(source.id.as_str()) {
                    return Err(invalid(format!("duplicate source id '{}'", source.id)));
                }
            }
        }
        Ok(())
    }
}
