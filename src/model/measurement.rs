//! Measurement documents: per-source results plus the aggregated block

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{Entity, EntityUserData};
use super::value::{format_number, parse_number, Scale};
use crate::status::Status;

/// Outcome of one source in one collection cycle
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceResult {
    pub source_id: String,
    pub value: Option<String>,
    pub total: Option<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    pub connection_error: Option<String>,
    pub parse_error: Option<String>,
    pub api_url: Option<String>,
    pub landing_url: Option<String>,
    #[serde(default)]
    pub entity_user_data: EntityUserData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl SourceResult {
    /// A source that produced a usable value
    pub fn success(
        source_id: impl Into<String>,
        value: impl Into<String>,
        total: Option<String>,
        entities: Vec<Entity>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            value: Some(value.into()),
            total,
            entities,
            ..Self::default()
        }
    }

    /// A source whose transport or HTTP exchange failed
    pub fn connection_failure(source_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            connection_error: Some(error.into()),
            ..Self::default()
        }
    }

    /// A source whose response could not be understood
    pub fn parse_failure(source_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            parse_error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_urls(mut self, api_url: Option<String>, landing_url: Option<String>) -> Self {
        self.api_url = api_url;
        self.landing_url = landing_url;
        self
    }

    pub fn has_error(&self) -> bool {
        self.connection_error.is_some() || self.parse_error.is_some()
    }

    /// The value that takes part in aggregation. For count-like scales,
    /// entities the user resolved are subtracted from the reported value.
    pub fn counted_value(&self, scale: Scale) -> Option<String> {
        if self.has_error() {
            return None;
        }
        let value = self.value.as_ref()?;
        if scale == Scale::VersionNumber {
            return Some(value.clone());
        }

        let resolved = self
            .entities
            .iter()
            .filter(|entity| {
                self.entity_user_data
                    .get(&entity.key)
                    .is_some_and(|annotation| annotation.status.is_resolved())
            })
            .count();
        if resolved == 0 {
            return Some(value.clone());
        }
        parse_number(value).map(|n| format_number((n - resolved as f64).max(0.0)))
    }

    /// Compare the collected content, ignoring user data and warnings.
    /// An extended head keeps the warnings of the cycle that appended it;
    /// later cycles with the same content only move its `end`.
    pub fn same_content(&self, other: &Self) -> bool {
        self.source_id == other.source_id
            && self.value == other.value
            && self.total == other.total
            && self.entities == other.entities
            && self.connection_error == other.connection_error
            && self.parse_error == other.parse_error
            && self.api_url == other.api_url
            && self.landing_url == other.landing_url
    }
}

/// Aggregated value and status on the metric's scale
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScaleMeasurement {
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
    pub status: Status,
    pub status_start: Option<DateTime<Utc>>,
}

impl ScaleMeasurement {
    fn same_content(&self, other: &Self) -> bool {
        self.value == other.value && self.total == other.total && self.status == other.status
    }
}

/// One snapshot in a metric's measurement log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: Uuid,
    pub metric_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub last: bool,
    pub sources: Vec<SourceResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<ScaleMeasurement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<ScaleMeasurement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_number: Option<ScaleMeasurement>,
}

impl Measurement {
    /// A fresh head candidate starting and ending at `now`
    pub fn new(
        metric_id: impl Into<String>,
        sources: Vec<SourceResult>,
        scale: Scale,
        aggregate: ScaleMeasurement,
        now: DateTime<Utc>,
    ) -> Self {
        let mut measurement = Self {
            id: Uuid::new_v4(),
            metric_id: metric_id.into(),
            start: now,
            end: now,
            last: true,
            sources,
            count: None,
            percentage: None,
            version_number: None,
        };
        measurement.set_aggregate(scale, aggregate);
        measurement
    }

    /// The aggregated block and the scale it is stored under
    pub fn aggregate(&self) -> Option<(Scale, &ScaleMeasurement)> {
        [
            (Scale::Count, &self.count),
            (Scale::Percentage, &self.percentage),
            (Scale::VersionNumber, &self.version_number),
        ]
        .into_iter()
        .find_map(|(scale, block)| block.as_ref().map(|b| (scale, b)))
    }

    /// Store `aggregate` under `scale`, clearing any other scale block
    pub fn set_aggregate(&mut self, scale: Scale, aggregate: ScaleMeasurement) {
        self.count = None;
        self.percentage = None;
        self.version_number = None;
        let slot = match scale {
            Scale::Count => &mut self.count,
            Scale::Percentage => &mut self.percentage,
            Scale::VersionNumber => &mut self.version_number,
        };
        *slot = Some(aggregate);
    }

    pub fn status(&self) -> Status {
        self.aggregate()
            .map(|(_, block)| block.status)
            .unwrap_or_default()
    }

    pub fn source(&self, source_id: &str) -> Option<&SourceResult> {
        self.sources.iter().find(|s| s.source_id == source_id)
    }

    /// Whether two snapshots carry the same collected content.
    /// Timestamps, ids, `last`, warnings and user data are ignored.
    pub fn same_content(&self, other: &Self) -> bool {
        let aggregates_match = match (self.aggregate(), other.aggregate()) {
            (Some((a_scale, a)), Some((b_scale, b))) => a_scale == b_scale && a.same_content(b),
            (None, None) => true,
            _ => false,
        };

        aggregates_match
            && self.metric_id == other.metric_id
            && self.sources.len() == other.sources.len()
            && self
                .sources
                .iter()
                .zip(&other.sources)
                .all(|(a, b)| a.same_content(b))
    }
}
