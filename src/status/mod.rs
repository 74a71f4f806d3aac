//! Status evaluation against target, near target and technical debt
//!
//! The evaluator is a pure function of the aggregated value, the metric's
//! policy and the current date, so it can be rerun whenever a user edits
//! the policy without collecting again.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::model::{MetricValue, ScaleMeasurement, StatusPolicy};

/// Evaluated status of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Unknown,
    TargetMet,
    DebtTargetMet,
    NearTargetMet,
    TargetNotMet,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::TargetMet => "target_met",
            Self::DebtTargetMet => "debt_target_met",
            Self::NearTargetMet => "near_target_met",
            Self::TargetNotMet => "target_not_met",
        };
        write!(f, "{name}")
    }
}

/// Map an aggregated value to a status under `policy` on `today`
pub fn evaluate(value: Option<&str>, policy: &StatusPolicy, today: NaiveDate) -> Status {
    let Some(value) = value.and_then(|v| MetricValue::parse(policy.scale, v)) else {
        return Status::Unknown;
    };

    let Some(target) = MetricValue::parse(policy.scale, &policy.target) else {
        warn!(
            "Target '{}' is not a valid {} value; status left unknown",
            policy.target, policy.scale
        );
        return Status::Unknown;
    };

    let direction = policy.direction;
    if direction.satisfies(&value, &target) {
        return Status::TargetMet;
    }

    if debt_accepted(policy, today) {
        let debt_target = policy
            .debt_target
            .as_deref()
            .and_then(|t| MetricValue::parse(policy.scale, t));
        if debt_target.is_some_and(|debt| direction.satisfies(&value, &debt)) {
            return Status::DebtTargetMet;
        }
    }

    let near_target = MetricValue::parse(policy.scale, &policy.near_target);
    if near_target.is_some_and(|near| direction.satisfies(&value, &near)) {
        return Status::NearTargetMet;
    }

    Status::TargetNotMet
}

/// Debt is accepted while the end date, if any, has not passed.
/// The end date itself is the last day the debt target applies.
pub fn debt_accepted(policy: &StatusPolicy, today: NaiveDate) -> bool {
    policy.accept_debt && policy.debt_end_date.is_none_or(|end| today <= end)
}

/// When did `status` begin, given the block it replaces?
pub fn status_start(
    previous: Option<&ScaleMeasurement>,
    status: Status,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match previous {
        Some(prev) if prev.status == status => prev.status_start.or(Some(now)),
        _ => Some(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, Scale};

    fn policy() -> StatusPolicy {
        StatusPolicy {
            scale: Scale::Count,
            direction: Direction::FewerIsBetter,
            target: "10".into(),
            near_target: "20".into(),
            accept_debt: false,
            debt_target: None,
            debt_end_date: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_thresholds_fewer_is_better() {
        let policy = policy();
        assert_eq!(evaluate(Some("5"), &policy, today()), Status::TargetMet);
        assert_eq!(evaluate(Some("10"), &policy, today()), Status::TargetMet);
        assert_eq!(evaluate(Some("15"), &policy, today()), Status::NearTargetMet);
        assert_eq!(evaluate(Some("25"), &policy, today()), Status::TargetNotMet);
    }

    #[test]
    fn test_undefined_value_is_unknown() {
        assert_eq!(evaluate(None, &policy(), today()), Status::Unknown);
        assert_eq!(evaluate(Some("n/a"), &policy(), today()), Status::Unknown);
    }

    #[test]
    fn test_debt_target() {
        let mut policy = policy();
        policy.accept_debt = true;
        policy.debt_target = Some("30".into());
        assert_eq!(evaluate(Some("25"), &policy, today()), Status::DebtTargetMet);
        assert_eq!(evaluate(Some("35"), &policy, today()), Status::TargetNotMet);

        policy.debt_end_date = Some(today());
        assert_eq!(evaluate(Some("25"), &policy, today()), Status::DebtTargetMet);

        policy.debt_end_date = today().pred_opt();
        assert_eq!(evaluate(Some("25"), &policy, today()), Status::TargetNotMet);
    }

    #[test]
    fn test_debt_wins_over_near_target() {
        let mut policy = policy();
        policy.accept_debt = true;
        policy.debt_target = Some("30".into());
        assert_eq!(evaluate(Some("15"), &policy, today()), Status::DebtTargetMet);
    }

    #[test]
    fn test_more_is_better() {
        let policy = StatusPolicy {
            direction: Direction::MoreIsBetter,
            target: "80".into(),
            near_target: "60".into(),
            scale: Scale::Percentage,
            ..policy()
        };
        assert_eq!(evaluate(Some("85"), &policy, today()), Status::TargetMet);
        assert_eq!(evaluate(Some("70"), &policy, today()), Status::NearTargetMet);
        assert_eq!(evaluate(Some("10"), &policy, today()), Status::TargetNotMet);
    }

    #[test]
    fn test_version_numbers() {
        let policy = StatusPolicy {
            scale: Scale::VersionNumber,
            direction: Direction::MoreIsBetter,
            target: "2.0".into(),
            near_target: "1.8".into(),
            ..policy()
        };
        assert_eq!(evaluate(Some("2.1.0"), &policy, today()), Status::TargetMet);
        assert_eq!(evaluate(Some("1.9"), &policy, today()), Status::NearTargetMet);
        assert_eq!(evaluate(Some("1.2"), &policy, today()), Status::TargetNotMet);
    }

    #[test]
    fn test_status_start_kept_while_status_unchanged() {
        let earlier = Utc::now() - chrono::Duration::days(3);
        let now = Utc::now();
        let previous = ScaleMeasurement {
            value: Some("25".into()),
            total: None,
            status: Status::TargetNotMet,
            status_start: Some(earlier),
        };
        assert_eq!(
            status_start(Some(&previous), Status::TargetNotMet, now),
            Some(earlier)
        );
        assert_eq!(status_start(Some(&previous), Status::TargetMet, now), Some(now));
        assert_eq!(status_start(None, Status::Unknown, now), Some(now));
    }
}
