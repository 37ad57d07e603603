//! Main entry point for the cnnvd-harvester CLI

use clap::Parser;
use cnnvd_harvester::cli::{version_text, Cli, Commands};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing(verbose: bool) {
    // Check if JSON output is requested via environment variable
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let default_level = if verbose {
        "cnnvd_harvester=debug"
    } else {
        "cnnvd_harvester=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Fetch(args) => args.execute(&cli).await.map(|_| ()),
        Commands::Search(args) => args.execute(&cli).await,
        Commands::Version => {
            println!("{}", version_text());
            Ok(())
        }
    };

    if let Err(e) = result.map_err(anyhow::Error::from) {
        error!("Command failed: {e:#}");
        std::process::exit(1);
    }
}
