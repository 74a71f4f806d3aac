use clap::Parser;
use quality_collector::app::{handle_fatal_error, init_logging, AppConfig};
use quality_collector::cli::{execute_command, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let app = match AppConfig::new(cli.verbose) {
        Ok(app) => app.with_config_path(cli.config.clone()),
        Err(e) => handle_fatal_error(e, cli.verbose),
    };
    init_logging(&app);

    if let Err(e) = execute_command(cli.command, &app).await {
        handle_fatal_error(e, cli.verbose);
    }
}
