//! Scales, operators and the string <-> value conversions used by the log
//!
//! Values travel through the pipeline and the stored documents as strings,
//! the way the external tools report them. They are only parsed when an
//! operator or comparison needs them.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Measurement scale of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    #[default]
    Count,
    Percentage,
    VersionNumber,
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Count => "count",
            Self::Percentage => "percentage",
            Self::VersionNumber => "version_number",
        };
        write!(f, "{name}")
    }
}

/// Operator combining per-source values into one metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Addition {
    #[default]
    Sum,
    Min,
    Max,
}

/// Whether lower or higher values are better
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "<", alias = "fewer_is_better")]
    FewerIsBetter,
    #[serde(rename = ">", alias = "more_is_better")]
    MoreIsBetter,
}

impl Direction {
    /// Does `value` satisfy `threshold` under this direction?
    pub fn satisfies(self, value: &MetricValue, threshold: &MetricValue) -> bool {
        match (self, value.partial_cmp(threshold)) {
            (_, None) => false,
            (Self::FewerIsBetter, Some(ordering)) => ordering != Ordering::Greater,
            (Self::MoreIsBetter, Some(ordering)) => ordering != Ordering::Less,
        }
    }
}

/// A parsed measurement value
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum MetricValue {
    Number(f64),
    Version(Version),
}

impl MetricValue {
    /// Parse a value string according to the scale; `None` when it doesn't fit
    pub fn parse(scale: Scale, raw: &str) -> Option<Self> {
        match scale {
            Scale::Count | Scale::Percentage => parse_number(raw).map(Self::Number),
            Scale::VersionNumber => parse_version(raw).map(Self::Version),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Version(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::Version(v) => write!(f, "{v}"),
        }
    }
}

/// Parse a numeric value as reported by a tool ("12", "12.5", " 3 ")
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Render a number without a trailing ".0" for integral values
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let rendered = format!("{value:.6}");
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// Lenient version parsing: "v1.2" reads as 1.2.0, components beyond the
/// third are ignored, a pre-release suffix is kept when it is valid semver.
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches(['v', 'V']);
    let (core, suffix) = match trimmed.find(['-', '+']) {
        Some(index) => trimmed.split_at(index),
        None => (trimmed, ""),
    };

    let mut parts = core
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    if parts.is_empty() {
        return None;
    }
    parts.resize(3, 0);

    let normalized = format!("{}.{}.{}", parts[0], parts[1], parts[2]);
    Version::parse(&format!("{normalized}{suffix}"))
        .or_else(|_| Version::parse(&normalized))
        .ok()
}
