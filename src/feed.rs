//! Inputs produced by the replay parser and the score evaluator.
//!
//! Ingestion only depends on the [`Replay`] and [`ScoreEvaluation`] traits.
//! [`ReplaySummary`] and [`SeasonScores`] are JSON-backed implementations of
//! them, used by the command-line front end.

use std::path::Path;

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::db::{ScoreLine, StatLine};

/// One row of a replay's per-player metrics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new, Getters)]
pub struct PlayerMetrics {
    player_name: String,
    #[serde(flatten)]
    stats: StatLine,
}

/// One player's evaluated scores for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new, Getters)]
pub struct ScoreRecord {
    player_name: String,
    week: i32,
    #[serde(flatten)]
    scores: ScoreLine,
}

/// A parsed replay of one round.
pub trait Replay {
    /// Seconds since the Unix epoch, UTC, when the round was played.
    fn utc_time(&self) -> i64;

    /// League the match belongs to.
    fn league(&self) -> &str;

    /// Season number.
    fn season(&self) -> i32;

    /// Position of the match within the season.
    fn match_id(&self) -> i32;

    /// Position of the round within the match.
    fn round_id(&self) -> i32;

    /// Name of the map the round was played on.
    fn map_name(&self) -> &str;

    /// Round length in whole minutes.
    fn duration_mins(&self) -> i32;

    /// Per-player metrics rows.
    fn metrics(&self) -> &[PlayerMetrics];
}

/// Weekly scores evaluated for one season.
pub trait ScoreEvaluation {
    /// Season the scores belong to.
    fn season_id(&self) -> i32;

    /// Per-player, per-week score records.
    fn scores(&self) -> &[ScoreRecord];
}

/// Error loading a feed file.
#[derive(Debug, Clone, Display, Error)]
#[display("Feed error: {} at {}:{}", message, file, line)]
pub struct FeedError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl FeedError {
    /// Creates a new feed error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T, FeedError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        FeedError::new(format!("Failed to read {} file {}: {}", what, path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        FeedError::new(format!("Failed to parse {} file {}: {}", what, path.display(), e))
    })
}

/// A replay summary as exported by the replay parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct ReplaySummary {
    utc_time: i64,
    league: String,
    season: i32,
    match_id: i32,
    round_id: i32,
    map_name: String,
    duration_mins: i32,
    metrics: Vec<PlayerMetrics>,
}

impl ReplaySummary {
    /// Loads a replay summary from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        debug!("Loading replay summary");
        let replay: Self = read_json(path.as_ref(), "replay")?;
        info!(
            league = %replay.league,
            season = replay.season,
            match_id = replay.match_id,
            round_id = replay.round_id,
            players = replay.metrics.len(),
            "Replay summary loaded"
        );
        Ok(replay)
    }
}

impl Replay for ReplaySummary {
    fn utc_time(&self) -> i64 {
        self.utc_time
    }

    fn league(&self) -> &str {
        &self.league
    }

    fn season(&self) -> i32 {
        self.season
    }

    fn match_id(&self) -> i32 {
        self.match_id
    }

    fn round_id(&self) -> i32 {
        self.round_id
    }

    fn map_name(&self) -> &str {
        &self.map_name
    }

    fn duration_mins(&self) -> i32 {
        self.duration_mins
    }

    fn metrics(&self) -> &[PlayerMetrics] {
        &self.metrics
    }
}

/// A season's score evaluation as exported by the score evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct SeasonScores {
    season_id: i32,
    scores: Vec<ScoreRecord>,
}

impl SeasonScores {
    /// Loads a score evaluation from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        debug!("Loading season scores");
        let scores: Self = read_json(path.as_ref(), "scores")?;
        info!(
            season_id = scores.season_id,
            records = scores.scores.len(),
            "Season scores loaded"
        );
        Ok(scores)
    }
}

impl ScoreEvaluation for SeasonScores {
    fn season_id(&self) -> i32 {
        self.season_id
    }

    fn scores(&self) -> &[ScoreRecord] {
        &self.scores
    }
}
