//! RouteGrid - dense route-by-month tables from sparse query exports
//!
//! A CLI tool that captures raw report query responses, one per route,
//! and rebuilds them into a single table with one row per route and one
//! column per year-month.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (no input documents, config, I/O, failed captures)
//!   2 - Documents were skipped and --fail-on-skip was set

mod aggregate;
mod cli;
mod config;
mod decode;
mod error;
mod fetch;
mod models;
mod report;
mod source;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, Command, FetchArgs, OutputFormat};
use config::{Config, CONFIG_FILE};
use models::TableMetadata;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("RouteGrid v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .routegrid.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the input pattern, output, and fetch endpoint.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` wins over the verbosity flags when set.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Dispatch the selected command. Returns the process exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;

    let Some(command) = args.command.clone() else {
        return Ok(0);
    };
    config.merge_with_args(&command);

    match command {
        Command::Parse(parse) => run_parse(&config, parse.dry_run),
        Command::Fetch(fetch) => run_fetch(&config, &fetch, args.quiet).await,
    }
}

/// Build the table from captured exports.
fn run_parse(config: &Config, dry_run: bool) -> Result<i32> {
    let start_time = Instant::now();
    let settings = &config.parse;

    let document_source = source::DocumentSource::new(source::SourceConfig::from(settings));
    let files = document_source.discover()?;

    if dry_run {
        println!("\n🔍 Dry run: {} document(s) match {}\n", files.len(), document_source.pattern());
        for file in &files {
            println!("     📄 {} -> {}", file.path.display(), file.identifier);
        }
        println!("\n✅ Dry run complete. Nothing was written.");
        return Ok(0);
    }

    println!("📥 Reading {} export(s) matching {}", files.len(), document_source.pattern());

    // Every document is decoded before the header is computed
    let batch = aggregate::collect(&files, &settings.id_column);
    let summary = batch.summary();

    if batch.entities.is_empty() {
        warn!("Every document was skipped; the table will only have a header");
    }
    if summary.duplicate_keys > 0 {
        warn!(
            "{} cell(s) were written twice within one document; the export may be malformed",
            summary.duplicate_keys
        );
    }

    let table = report::emit_table(&batch, settings.mode);

    let output = match settings.format {
        OutputFormat::Csv => report::generate_csv(&table)?,
        OutputFormat::Json => {
            let metadata = TableMetadata {
                generated_at: Utc::now(),
                input: settings.input.clone(),
                mode: settings.mode,
                summary: summary.clone(),
                skipped: batch.skipped.clone(),
            };
            report::generate_json(&table, &metadata)?
        }
    };
    report::save(&output, &settings.output)?;

    println!("\n📊 Summary:");
    println!("   Routes: {}", summary.entities);
    println!("   Years: {}", batch.header.years().join(", "));
    println!("   Cells filled: {}", summary.cells);
    println!("   Values: {}", settings.mode);
    if !batch.skipped.is_empty() {
        println!("   Skipped: {}", summary.skipped);
        for skipped in &batch.skipped {
            println!("     ⚠️  {}: {}", skipped.path.display(), skipped.reason);
        }
    }
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!(
        "\n✅ Wrote {} with {} route(s).",
        settings.output.display(),
        summary.entities
    );

    if settings.fail_on_skip && summary.skipped > 0 {
        eprintln!(
            "\n⛔ {} document(s) were skipped. Failing (exit code 2).",
            summary.skipped
        );
        return Ok(2);
    }

    Ok(0)
}

/// Capture one raw export per route.
async fn run_fetch(config: &Config, args: &FetchArgs, quiet: bool) -> Result<i32> {
    let template = fetch::QueryTemplate::load(&args.request_body)?;
    let routes = fetch::read_routes(&args.routes)?;
    if routes.is_empty() {
        anyhow::bail!("No routes listed in {}", args.routes.display());
    }

    let mut options = fetch::FetchOptions::from(&config.fetch);
    options.show_progress = !quiet;

    println!("🌐 Capturing {} route(s) into {}", routes.len(), args.export.display());
    println!("   Endpoint: {}", options.endpoint);
    println!("   Delay: {}ms", options.delay.as_millis());

    let fetcher = fetch::Fetcher::new(options)?;
    let summary = fetcher.run(&args.export, &template, &routes).await?;

    println!("\n✅ Captured {} of {} route(s).", summary.written.len(), routes.len());
    if !summary.failed.is_empty() {
        for (route, reason) in &summary.failed {
            eprintln!("   ❌ {}: {}", route, reason);
        }
        return Ok(1);
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
