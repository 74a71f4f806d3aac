//! CLI argument structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Collect software-quality metrics into a measurement log
#[derive(Parser)]
#[command(name = "quality-collector")]
#[command(about = "quality-collector - Measure software quality from the tools you already run", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the settings file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one collection cycle and print the status per metric
    Collect {
        /// Metric to collect (repeatable; defaults to all metrics)
        #[arg(short, long = "metric", value_name = "ID")]
        metrics: Vec<String>,
    },

    /// Recompute the latest status after editing a metric's targets
    Reevaluate {
        #[arg(short, long, value_name = "ID")]
        metric: String,
    },

    /// List the measurements of a metric
    History {
        #[arg(short, long, value_name = "ID")]
        metric: String,

        /// Print the measurement documents as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the status of an entity reported by a source
    Annotate {
        #[arg(short, long, value_name = "ID")]
        metric: String,

        /// Source the entity belongs to
        #[arg(short, long, value_name = "ID")]
        source: String,

        /// Entity key as shown in the measurement
        #[arg(short, long, value_name = "KEY")]
        entity: String,

        /// unconfirmed, confirmed, false_positive, wont_fix or fixed
        #[arg(long)]
        status: String,

        /// Why the entity has this status
        #[arg(long)]
        rationale: Option<String>,
    },
}
