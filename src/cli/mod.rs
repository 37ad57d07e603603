//! CLI command implementations

pub mod error;
pub mod fetch;
pub mod search;

pub use error::CliError;
pub use fetch::FetchArgs;
pub use search::{SearchArgs, SearchKind};

use crate::fetcher::cnnvd_config::CnnvdEndpoints;
use crate::fetcher::cnnvd_http::CnnvdHttpClient;
use crate::fetcher::retry::DEFAULT_ATTEMPTS;
use clap::{Parser, Subcommand};

/// CNNVD vulnerability harvester CLI
#[derive(Parser, Debug)]
#[command(name = "cnnvd-harvester")]
#[command(about = "Collect vulnerability records from CNNVD", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (progress bars are replaced by log lines)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Attempts per request before giving up (default: 5, range: 1-20)
    #[arg(short, long, global = true, default_value_t = DEFAULT_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub retry: u32,

    /// Base URL of the CNNVD site
    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Harvest vulnerability records into a directory
    Fetch(FetchArgs),

    /// Query the remote database without storing anything
    Search(SearchArgs),

    /// Print version information
    Version,
}

impl Cli {
    /// HTTP source honouring `--base-url`
    pub fn source(&self) -> Result<CnnvdHttpClient, CliError> {
        let endpoints = match &self.base_url {
            Some(url) => CnnvdEndpoints::with_base_url(url),
            None => CnnvdEndpoints::default(),
        };
        Ok(CnnvdHttpClient::with_endpoints(endpoints)?)
    }
}

/// Text printed by the `version` command
pub fn version_text() -> String {
    format!(
        "{} version {}\n{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_REPOSITORY")
    )
}
