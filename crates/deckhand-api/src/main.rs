//! Deckhand CLI and webhook server entry point.
//!
//! Binary name: `deckhand`
//!
//! Parses CLI arguments, installs the tracing subscriber, then dispatches to
//! the command handler. `serve` runs until Ctrl+C or SIGTERM.

mod cli;
mod http;
mod state;

use clap::Parser;

use cli::{Cli, Commands, LogFormat};
use deckhand_observe::tracing_setup::{
    TracingOptions, filter_for_verbosity, init_tracing, shutdown_tracing,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&TracingOptions {
        default_filter: filter_for_verbosity(cli.verbose, cli.quiet).to_string(),
        json: cli.log_format == LogFormat::Json,
        otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let overrides = cli.overrides();

    let result = match cli.command {
        Commands::Serve { dry_run, .. } => cli::serve::serve(&overrides, dry_run).await,
        Commands::Services { json } => cli::services::list_services(&overrides, json).await,
        Commands::Sign { file, json } => cli::sign::sign_payload(&overrides, &file, json).await,
    };

    shutdown_tracing();
    result
}
