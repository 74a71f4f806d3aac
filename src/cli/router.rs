//! Command routing and execution

use anyhow::Result;

use crate::app::AppConfig;
use crate::cli::args::Commands;
use crate::cli::commands::{
    annotate::AnnotateArgs, run_annotate, run_collect, run_history, run_reevaluate,
    CommandContext,
};

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(command: Commands, app: &AppConfig) -> Result<()> {
    let context = CommandContext::open(app).await?;

    match command {
        Commands::Collect { metrics } => run_collect(context, &metrics).await,
        Commands::Reevaluate { metric } => run_reevaluate(context, &metric).await,
        Commands::History { metric, json } => run_history(context, &metric, json).await,
        Commands::Annotate {
            metric,
            source,
            entity,
            status,
            rationale,
        } => {
            run_annotate(
                context,
                AnnotateArgs {
                    metric_id: &metric,
                    source_id: &source,
                    entity_key: &entity,
                    status: &status,
                    rationale,
                },
            )
            .await
        }
    }
}
