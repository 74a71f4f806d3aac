use anyhow::Result;
use std::io::Write;

use super::CommandContext;
use crate::error::QualityError;
use crate::model::Measurement;

pub async fn run_history(context: CommandContext, metric_id: &str, json: bool) -> Result<()> {
    context.settings.metric(metric_id)?;
    let history = context
        .log
        .history(metric_id)
        .await
        .map_err(QualityError::from)?;

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &history)?;
        writeln!(out)?;
        return Ok(());
    }

    if history.is_empty() {
        writeln!(out, "{metric_id}: no measurements yet")?;
    }
    for measurement in &history {
        writeln!(out, "{}", history_line(measurement))?;
    }
    Ok(())
}

fn history_line(measurement: &Measurement) -> String {
    let (value, total) = measurement
        .aggregate()
        .map(|(_, block)| (block.value.as_deref(), block.total.as_deref()))
        .unwrap_or((None, None));
    let value = match (value, total) {
        (Some(v), Some(t)) => format!("{v}/{t}"),
        (Some(v), None) => v.to_string(),
        (None, _) => "?".to_string(),
    };
    format!(
        "{} {} .. {}  {:<16} {}",
        if measurement.last { "*" } else { " " },
        measurement.start.format("%Y-%m-%d %H:%M:%S"),
        measurement.end.format("%Y-%m-%d %H:%M:%S"),
        measurement.status().to_string(),
        value
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Scale, ScaleMeasurement};
    use crate::status::Status;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_history_line() {
        let start = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
        let mut measurement = Measurement::new(
            "m",
            vec![],
            Scale::Count,
            ScaleMeasurement {
                value: Some("7".into()),
                total: Some("20".into()),
                status: Status::TargetMet,
                status_start: Some(start),
            },
            start,
        );
        measurement.end = start + chrono::Duration::hours(1);

        assert_eq!(
            history_line(&measurement),
            "* 2026-10-19 08:00:00 .. 2026-10-19 09:00:00  target_met       7/20"
        );
    }
}
