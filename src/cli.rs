//! Command-line interface for league_stats.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// League Stats - store replay statistics and weekly scores
#[derive(Parser, Debug)]
#[command(name = "league_stats")]
#[command(about = "Get-or-create storage for league match statistics", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database location: a path or `sqlite:///path`. Overrides the config
    /// file and the LEAGUE_STATS_DB environment variable.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Path to a TOML storage config
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create all tables that do not exist yet
    Init,

    /// Store a replay summary (JSON)
    IngestReplay {
        /// Path to the replay summary file
        file: PathBuf,
    },

    /// Store a season's weekly scores (JSON)
    IngestScores {
        /// Path to the score evaluation file
        file: PathBuf,
    },
}
