use anyhow::Result;
use chrono::Utc;

use super::CommandContext;
use crate::error::QualityError;
use crate::measurement_log::RecordOutcome;

pub async fn run_reevaluate(context: CommandContext, metric_id: &str) -> Result<()> {
    let metric = context.settings.metric(metric_id)?;
    let outcome = context
        .log
        .reevaluate(metric_id, metric, Utc::now())
        .await
        .map_err(QualityError::from)?;

    match outcome {
        RecordOutcome::Appended(head) => {
            println!("{metric_id}: status now {}", head.status())
        }
        other => println!("{metric_id}: status unchanged ({})", other.measurement().status()),
    }
    Ok(())
}
