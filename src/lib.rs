//! League Stats library - get-or-create persistence for match statistics
//!
//! Stores players, matches, rounds, per-round player statistics and weekly
//! player scores in a relational store, reusing existing rows instead of
//! duplicating them.
//!
//! # Architecture
//!
//! - **Schema**: five tables forming a tree (match → round → stats ← player,
//!   player → scores)
//! - **Repository**: one long-lived connection with typed get-or-create operations
//! - **Ingest**: replay and score-evaluation ingestion, one transaction per call
//! - **Feed**: the contracts replay parsers and score evaluators implement
//!
//! # Example
//!
//! ```no_run
//! use league_stats::{IngestService, ReplaySummary, StatsRepository};
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut repository = StatsRepository::open_path("league.db")?;
//! repository.create_db()?;
//!
//! let mut service = IngestService::new(repository);
//! let replay = ReplaySummary::from_file("round.json")?;
//! let report = service.add_replay(&replay)?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod db;
mod feed;
mod ingest;

// Crate-level exports - Configuration
pub use config::{Backend, ConfigError, DATABASE_ENV_VAR, StorageConfig};

// Crate-level exports - Storage
pub use db::{
    DbError, DbErrorKind, Entry, Match, MatchKey, NewMatch, NewPlayer, NewPlayerScores,
    NewPlayerStats, NewRound, Player, PlayerKey, PlayerScores, PlayerScoresKey, PlayerStats,
    PlayerStatsKey, Round, RoundKey, ScoreLine, StatLine, StatsRepository, StatsSession,
    StatsStore,
};

// Crate-level exports - Collaborator feeds
pub use feed::{
    FeedError, PlayerMetrics, Replay, ReplaySummary, ScoreEvaluation, ScoreRecord, SeasonScores,
};

// Crate-level exports - Ingestion
pub use ingest::{EntityTally, IngestReport, IngestService, split_utc_timestamp};
