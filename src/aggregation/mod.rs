//! Combining per-source results into one metric-level value
//!
//! Sources in error contribute nothing to the operator's domain; when no
//! source is left the value is undefined rather than zero.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{
    format_number, parse_number, parse_version, Addition, Direction, Scale, SourceResult,
};

/// Metric-level value and total
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Aggregate {
    pub value: Option<String>,
    pub total: Option<String>,
}

impl Aggregate {
    fn undefined() -> Self {
        Self::default()
    }
}

/// Aggregate `sources` on `scale` with `addition`
pub fn aggregate(
    sources: &[SourceResult],
    scale: Scale,
    addition: Addition,
    direction: Direction,
) -> Aggregate {
    match scale {
        Scale::Count => aggregate_count(sources, addition),
        Scale::Percentage => aggregate_percentage(sources, addition, direction),
        Scale::VersionNumber => aggregate_version(sources, addition),
    }
}

/// (value, total) pairs of the sources that produced a usable number
fn numeric_domain(sources: &[SourceResult], scale: Scale) -> Vec<(f64, Option<f64>)> {
    sources
        .iter()
        .filter_map(|source| {
            let raw = source.counted_value(scale)?;
            match parse_number(&raw) {
                Some(value) => Some((value, source.total.as_deref().and_then(parse_number))),
                None => {
                    warn!(
                        "Source {} reported non-numeric value '{}'; excluded from aggregation",
                        source.source_id, raw
                    );
                    None
                }
            }
        })
        .collect()
}

fn aggregate_count(sources: &[SourceResult], addition: Addition) -> Aggregate {
    let domain = numeric_domain(sources, Scale::Count);
    if domain.is_empty() {
        return Aggregate::undefined();
    }

    let (value, total) = match addition {
        Addition::Sum => {
            let value = domain.iter().map(|(v, _)| v).sum::<f64>();
            let totals: Vec<f64> = domain.iter().filter_map(|(_, t)| *t).collect();
            let total = (!totals.is_empty()).then(|| totals.iter().sum::<f64>());
            (value, total)
        }
        Addition::Min => pick(&domain, |a, b| a < b),
        Addition::Max => pick(&domain, |a, b| a > b),
    };

    Aggregate {
        value: Some(format_number(value)),
        total: total.map(format_number),
    }
}

/// The (value, total) pair whose value wins `better` against all others
fn pick(domain: &[(f64, Option<f64>)], better: impl Fn(f64, f64) -> bool) -> (f64, Option<f64>) {
    domain
        .iter()
        .copied()
        .reduce(|best, candidate| {
            if better(candidate.0, best.0) {
                candidate
            } else {
                best
            }
        })
        .unwrap_or((0.0, None))
}

fn aggregate_percentage(
    sources: &[SourceResult],
    addition: Addition,
    direction: Direction,
) -> Aggregate {
    // A ratio needs both halves
    for source in sources.iter().filter(|s| {
        s.counted_value(Scale::Percentage).is_some()
            && s.total.as_deref().and_then(parse_number).is_none()
    }) {
        warn!(
            "Source {} reported no usable total; excluded from the percentage",
            source.source_id
        );
    }
    let domain: Vec<(f64, f64)> = numeric_domain(sources, Scale::Percentage)
        .into_iter()
        .filter_map(|(value, total)| Some((value, total?)))
        .collect();
    if domain.is_empty() {
        return Aggregate::undefined();
    }

    let value = match addition {
        Addition::Sum => {
            let value = domain.iter().map(|(v, _)| v).sum::<f64>();
            let total = domain.iter().map(|(_, t)| t).sum::<f64>();
            percentage(value, total, direction)
        }
        Addition::Min | Addition::Max => {
            let percentages = domain
                .iter()
                .map(|(v, t)| percentage(*v, *t, direction));
            if addition == Addition::Min {
                percentages.fold(f64::INFINITY, f64::min)
            } else {
                percentages.fold(f64::NEG_INFINITY, f64::max)
            }
        }
    };

    Aggregate {
        value: Some(format_number(value)),
        total: None,
    }
}

/// Ratio as a whole percentage, rounded in the unfavourable direction.
/// A zero total reads as 0% when fewer is better and 100% otherwise.
pub fn percentage(value: f64, total: f64, direction: Direction) -> f64 {
    if total == 0.0 {
        return match direction {
            Direction::FewerIsBetter => 0.0,
            Direction::MoreIsBetter => 100.0,
        };
    }
    let ratio = 100.0 * value / total;
    match direction {
        Direction::FewerIsBetter => ratio.ceil(),
        Direction::MoreIsBetter => ratio.floor(),
    }
}

fn aggregate_version(sources: &[SourceResult], addition: Addition) -> Aggregate {
    let versions = sources
        .iter()
        .filter_map(|source| source.counted_value(Scale::VersionNumber))
        .filter_map(|raw| parse_version(&raw));

    let chosen = match addition {
        Addition::Min => versions.min(),
        Addition::Max | Addition::Sum => versions.max(),
    };

    Aggregate {
        value: chosen.map(|v| v.to_string()),
        total: None,
    }
}
