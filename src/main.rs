//! Crates-Harvester main entry point
//!
//! This is the command-line interface for the crates.io data connector.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use crates_harvester::archive::Archive;
use crates_harvester::backend::CratesBackend;
use crates_harvester::client::{ArchiveMode, CratesClient, Transport};
use crates_harvester::config::{load_config_with_hash, Config};
use crates_harvester::dates::{parse_timestamp, DEFAULT_DATETIME};
use crates_harvester::item::Category;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Crates-Harvester: fetch crate metadata and registry summaries
///
/// Walks the crates.io API, enriches every crate updated since --from-date
/// with its owners, versions and download statistics, and prints one JSON
/// item per crate (or a single registry summary).
#[derive(Parser, Debug)]
#[command(name = "crates-harvester")]
#[command(version)]
#[command(about = "Fetch crates.io crates and summary as JSON items", long_about = None)]
struct Cli {
    /// Category of items to fetch: crates or summary
    #[arg(value_name = "CATEGORY", default_value = "crates")]
    category: Category,

    /// Fetch crates updated since this date (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_from_date)]
    from_date: Option<DateTime<Utc>>,

    /// Seconds to sleep before retrying a failed request
    #[arg(long)]
    sleep_time: Option<u64>,

    /// Label attached to every emitted item (defaults to the origin)
    #[arg(long)]
    tag: Option<String>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Record every response to this archive file
    #[arg(long, value_name = "PATH")]
    archive_path: Option<PathBuf>,

    /// Replay responses from --archive-path instead of the network
    #[arg(long, requires = "archive_path")]
    fetch_archive: bool,

    /// Bearer token sent with every request
    #[arg(short = 't', long)]
    api_token: Option<String>,

    /// Disable TLS certificate verification
    #[arg(long)]
    no_ssl_verify: bool,

    /// Print each item on a single line
    #[arg(long)]
    json_line: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_from_date(value: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    if let Some(sleep_time) = cli.sleep_time {
        config.client.sleep_time = sleep_time;
    }
    if cli.no_ssl_verify {
        config.client.ssl_verify = false;
    }

    let from_date = cli.from_date.unwrap_or(DEFAULT_DATETIME);
    let backend = build_backend(&cli, &config, config_hash, from_date)?;

    let count = handle_fetch(&backend, cli.category, from_date, cli.json_line).await?;
    tracing::info!("Fetch finished: {} items", count);

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout is reserved for items.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crates_harvester=info,warn"),
            1 => EnvFilter::new("crates_harvester=debug,info"),
            2 => EnvFilter::new("crates_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds the backend, wiring in the token and archive
fn build_backend(
    cli: &Cli,
    config: &Config,
    config_hash: Option<String>,
    from_date: DateTime<Utc>,
) -> anyhow::Result<CratesBackend> {
    let api_root = Url::parse(&config.client.api_root).context("invalid api-root")?;
    let mut transport = Transport::new(&config.client)?;

    if let Some(token) = &cli.api_token {
        transport = transport.with_token(token.as_str());
    }

    let archive_mode = match (&cli.archive_path, cli.fetch_archive) {
        (Some(path), true) => {
            let archive = Archive::open(path)
                .with_context(|| format!("failed to open archive {}", path.display()))?;
            let metadata = archive.metadata()?;
            tracing::info!(
                "Replaying {} archive created on {}",
                metadata.category,
                metadata.created_on
            );
            ArchiveMode::Replay(archive)
        }
        (Some(path), false) => {
            let archive = Archive::create(path)
                .with_context(|| format!("failed to create archive {}", path.display()))?;
            tracing::info!("Recording responses to {}", path.display());
            ArchiveMode::Record(archive)
        }
        (None, _) => ArchiveMode::Off,
    };

    let mut backend = CratesBackend::new(
        CratesClient::with_transport(api_root, transport.with_archive(archive_mode)),
        &config.client.origin,
    );
    if let Some(tag) = &cli.tag {
        backend = backend.with_tag(tag.as_str());
    }

    if let Some(archive) = backend.client().transport().archive() {
        if !backend.client().transport().is_replaying() {
            let mut metadata = backend.archive_metadata(cli.category, from_date);
            metadata.config_hash = config_hash;
            archive.init_metadata(&metadata)?;
        }
    }

    Ok(backend)
}

/// Handles the main fetch operation, writing items to stdout
async fn handle_fetch(
    backend: &CratesBackend,
    category: Category,
    from_date: DateTime<Utc>,
    json_line: bool,
) -> anyhow::Result<u64> {
    let mut items = backend.fetch(category, from_date)?;
    let stdout = std::io::stdout();

    loop {
        let envelope = match items.next_item().await {
            Ok(Some(envelope)) => envelope,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Fetch failed after {} items: {}", items.fetched(), e);
                return Err(e.into());
            }
        };

        let text = if json_line {
            serde_json::to_string(&envelope)?
        } else {
            serde_json::to_string_pretty(&envelope)?
        };

        let mut out = stdout.lock();
        writeln!(out, "{}", text)?;
        out.flush()?;
    }

    Ok(items.fetched())
}
