//! Metric and source configuration as it reaches the collector

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::value::{Addition, Direction, Scale};

/// A configured quality measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(rename = "type")]
    pub metric_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub scale: Scale,
    #[serde(default)]
    pub addition: Addition,
    #[serde(default)]
    pub direction: Direction,
    pub target: String,
    pub near_target: String,
    #[serde(default)]
    pub accept_debt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debt_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debt_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Metric {
    /// The policy fields the status evaluator looks at
    pub fn status_policy(&self) -> StatusPolicy {
        StatusPolicy {
            scale: self.scale,
            direction: self.direction,
            target: self.target.clone(),
            near_target: self.near_target.clone(),
            accept_debt: self.accept_debt,
            debt_target: self.debt_target.clone(),
            debt_end_date: self.debt_end_date,
        }
    }

    /// Display name, falling back to the metric type
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.metric_type)
    }
}

/// One configured source of a metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Target, direction and technical-debt settings of a metric
#[derive(Debug, Clone, PartialEq)]
pub struct StatusPolicy {
    pub scale: Scale,
    pub direction: Direction,
    pub target: String,
    pub near_target: String,
    pub accept_debt: bool,
    pub debt_target: Option<String>,
    pub debt_end_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_from_yaml() {
        let yaml = r#"
type: violations
scale: count
addition: max
direction: "<"
target: "10"
near_target: "20"
accept_debt: true
debt_target: "30"
debt_end_date: 2026-12-31
sources:
  - id: sonar
    type: manual_number
    parameters:
      number: "12"
"#;
        let metric: Metric = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(metric.addition, Addition::Max);
        assert_eq!(metric.sources.len(), 1);
        assert_eq!(metric.sources[0].source_type, "manual_number");
        assert_eq!(
            metric.debt_end_date,
            NaiveDate::from_ymd_opt(2026, 12, 31)
        );
        assert_eq!(metric.display_name(), "violations");
    }
}
