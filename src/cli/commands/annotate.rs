use anyhow::Result;
use chrono::Utc;

use super::CommandContext;
use crate::error::{common, QualityError};
use crate::model::{EntityAnnotation, EntityStatus};

pub struct AnnotateArgs<'a> {
    pub metric_id: &'a str,
    pub source_id: &'a str,
    pub entity_key: &'a str,
    pub status: &'a str,
    pub rationale: Option<String>,
}

pub async fn run_annotate(context: CommandContext, args: AnnotateArgs<'_>) -> Result<()> {
    let metric = context.settings.metric(args.metric_id)?;
    let status: EntityStatus = args
        .status
        .parse()
        .map_err(|e: String| common::invalid_input("status", e))?;
    let annotation = EntityAnnotation {
        status,
        rationale: args.rationale,
        updated_at: None,
    };

    let outcome = context
        .log
        .annotate(
            args.metric_id,
            metric,
            args.source_id,
            args.entity_key,
            annotation,
            Utc::now(),
        )
        .await
        .map_err(QualityError::from)?;

    let head = outcome.measurement();
    println!(
        "{}: entity {} of {} marked {}; status {}",
        args.metric_id,
        args.entity_key,
        args.source_id,
        args.status,
        head.status()
    );
    Ok(())
}
