//! Test data builders for metrics and sources

use chrono::NaiveDate;
use serde_json::Value;

use crate::model::{Addition, Direction, Metric, Scale, SourceConfig};

/// A source of type `source_type` with the given JSON object as parameters
pub fn source(id: &str, source_type: &str, parameters: Value) -> SourceConfig {
    SourceConfig {
        id: id.to_string(),
        source_type: source_type.to_string(),
        parameters: match parameters {
            Value::Object(map) => map,
            _ => Default::default(),
        },
    }
}

/// Builder for creating test metrics
pub struct MetricBuilder {
    metric: Metric,
}

impl Default for MetricBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricBuilder {
    /// A fewer-is-better count metric with target 10 and near target 20
    pub fn new() -> Self {
        Self {
            metric: Metric {
                metric_type: "violations".to_string(),
                name: None,
                scale: Scale::Count,
                addition: Addition::Sum,
                direction: Direction::FewerIsBetter,
                target: "10".to_string(),
                near_target: "20".to_string(),
                accept_debt: false,
                debt_target: None,
                debt_end_date: None,
                sources: Vec::new(),
            },
        }
    }

    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.metric.scale = scale;
        self
    }

    pub fn with_addition(mut self, addition: Addition) -> Self {
        self.metric.addition = addition;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.metric.direction = direction;
        self
    }

    pub fn with_targets(mut self, target: &str, near_target: &str) -> Self {
        self.metric.target = target.to_string();
        self.metric.near_target = near_target.to_string();
        self
    }

    pub fn with_debt(mut self, debt_target: &str, end: Option<NaiveDate>) -> Self {
        self.metric.accept_debt = true;
        self.metric.debt_target = Some(debt_target.to_string());
        self.metric.debt_end_date = end;
        self
    }

    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.metric.sources.push(source);
        self
    }

    pub fn build(self) -> Metric {
        self.metric
    }
}
