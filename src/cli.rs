//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// RouteGrid - dense route-by-month tables from sparse query exports
///
/// Capture one raw query response per route, then rebuild a single table
/// with one row per route and one column per year-month.
///
/// Examples:
///   routegrid fetch --export exports --request-body body.json --routes routes.txt
///   routegrid parse --input 'exports/*.json'
///   routegrid parse --input 'exports/*.json' --as-percent --format json -o otp.json
///   routegrid parse --dry-run
///   routegrid --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .routegrid.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .routegrid.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build the route-by-month table from captured exports
    Parse(ParseArgs),
    /// Capture one raw export per route from the query endpoint
    Fetch(FetchArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ParseArgs {
    /// Glob pattern for input files (default: *.json)
    ///
    /// Example: --input 'exports/*.json'
    #[arg(short, long, value_name = "GLOB")]
    pub input: Option<String>,

    /// Output file path (default: routes_by_month.csv)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Multiply values by 100 and write them as percentages (e.g. 69.12)
    #[arg(long)]
    pub as_percent: bool,

    /// Output format (csv, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Name of the identifier column (default: Route)
    #[arg(long, value_name = "NAME")]
    pub id_column: Option<String>,

    /// List the documents that would be processed and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with code 2 if any document had to be skipped
    #[arg(long)]
    pub fail_on_skip: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct FetchArgs {
    /// Directory the raw exports are written to (created if missing)
    #[arg(long, value_name = "DIR")]
    pub export: PathBuf,

    /// JSON file used as the request body template
    #[arg(long, value_name = "FILE")]
    pub request_body: PathBuf,

    /// Newline-separated file of route names
    #[arg(long, value_name = "FILE")]
    pub routes: PathBuf,

    /// Query endpoint URL
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Report resource key sent with every request
    #[arg(long, value_name = "KEY", env = "ROUTEGRID_RESOURCE_KEY", hide_env_values = true)]
    pub resource_key: Option<String>,

    /// Pause between requests in milliseconds (default: 500)
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Request timeout in seconds (default: 60)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Output format for the table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// CSV format (default)
    #[default]
    Csv,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Skip the rest for --init-config
        if self.init_config {
            return Ok(());
        }

        match &self.command {
            None => Err("No command given; use `parse` or `fetch` (see --help)".to_string()),
            Some(Command::Parse(args)) => args.validate(),
            Some(Command::Fetch(args)) => args.validate(),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

impl ParseArgs {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref id) = self.id_column {
            if id.trim().is_empty() {
                return Err("Identifier column name cannot be empty".to_string());
            }
        }
        if let Some(ref input) = self.input {
            if input.trim().is_empty() {
                return Err("Input pattern cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl FetchArgs {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref endpoint) = self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err("Endpoint URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        for (flag, path) in [("--request-body", &self.request_body), ("--routes", &self.routes)] {
            if !path.is_file() {
                return Err(format!("{} file does not exist: {}", flag, path.display()));
            }
        }

        Ok(())
    }
}
