//! League Stats - command-line front end

#![warn(missing_docs)]

mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use league_stats::{IngestService, ReplaySummary, SeasonScores, StatsRepository, StorageConfig};
use tracing::{debug, info, instrument};
use tracing_subscriber::EnvFilter;

const DEFAULT_DATABASE_PATH: &str = "league_stats.db";

fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Init => run_init(&config),
        Command::IngestReplay { file } => run_ingest_replay(&config, file),
        Command::IngestScores { file } => run_ingest_scores(&config, file),
    }
}

/// Config file (or default), then environment, then `--db`.
#[instrument(skip(cli))]
fn resolve_config(cli: &Cli) -> Result<StorageConfig> {
    let config = match &cli.config {
        Some(path) => StorageConfig::from_file(path)?,
        None => StorageConfig::new(DEFAULT_DATABASE_PATH.to_string()),
    };
    let config = config.with_env_override();

    let config = match &cli.db {
        Some(location) => StorageConfig::parse_location(location)?,
        None => config,
    };

    debug!(?config, "Storage config resolved");
    Ok(config)
}

/// Open the store and make sure the schema exists.
#[instrument(skip(config))]
fn open_store(config: &StorageConfig) -> Result<StatsRepository> {
    let mut repository = StatsRepository::open(config)?;
    repository.create_db()?;
    Ok(repository)
}

/// Create the schema.
fn run_init(config: &StorageConfig) -> Result<()> {
    open_store(config)?;
    info!(path = %config.database_path(), "Database initialized");
    println!("Initialized {}", config.database_path());
    Ok(())
}

/// Ingest one replay summary.
#[instrument(skip(config, file), fields(file = %file.display()))]
fn run_ingest_replay(config: &StorageConfig, file: PathBuf) -> Result<()> {
    let replay = ReplaySummary::from_file(&file)?;
    let mut service = IngestService::new(open_store(config)?);
    let report = service.add_replay(&replay)?;
    println!("{}: {}", file.display(), report);
    Ok(())
}

/// Ingest one season's scores.
#[instrument(skip(config, file), fields(file = %file.display()))]
fn run_ingest_scores(config: &StorageConfig, file: PathBuf) -> Result<()> {
    let scores = SeasonScores::from_file(&file)?;
    let mut service = IngestService::new(open_store(config)?);
    let report = service.add_scores(&scores)?;
    println!("{}: {}", file.display(), report);
    Ok(())
}
