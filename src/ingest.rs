//! Composite ingestion of replays and weekly scores.

use chrono::{DateTime, NaiveDate, NaiveTime};
use derive_getters::Getters;
use derive_more::Display;
use tracing::{debug, info, instrument};

use crate::db::{
    DbError, DbErrorKind, Entry, MatchKey, PlayerScoresKey, PlayerStatsKey, RoundKey,
    StatsRepository, StatsStore,
};
use crate::feed::{Replay, ScoreEvaluation};

/// Created/reused counts for one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Getters)]
#[display("{created} new, {reused} existing")]
pub struct EntityTally {
    created: usize,
    reused: usize,
}

impl EntityTally {
    fn record<T>(&mut self, entry: &Entry<T>) {
        if entry.exists() {
            self.reused += 1;
        } else {
            self.created += 1;
        }
    }
}

/// What one ingestion call wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Getters)]
#[display(
    "players: {players}; matches: {matches}; rounds: {rounds}; stats: {player_stats}; scores: {player_scores}"
)]
pub struct IngestReport {
    players: EntityTally,
    matches: EntityTally,
    rounds: EntityTally,
    player_stats: EntityTally,
    player_scores: EntityTally,
}

/// Splits a Unix timestamp into a UTC calendar date and time of day.
///
/// # Errors
///
/// Returns [`DbError`] if the timestamp is out of chrono's range.
#[instrument]
pub fn split_utc_timestamp(utc_time: i64) -> Result<(NaiveDate, NaiveTime), DbError> {
    let dt = DateTime::from_timestamp(utc_time, 0)
        .ok_or_else(|| DbError::new(DbErrorKind::InvalidTimestamp(utc_time)))?;
    Ok((dt.date_naive(), dt.time()))
}

/// Feeds replays and score evaluations into the statistics store.
///
/// Each call runs in one transaction: either every row it needs is stored,
/// or none is.
#[derive(Debug)]
pub struct IngestService {
    repository: StatsRepository,
}

impl IngestService {
    /// Creates a new ingest service backed by the given repository.
    #[instrument(skip(repository))]
    pub fn new(repository: StatsRepository) -> Self {
        info!(path = %repository.location(), "Creating IngestService");
        Self { repository }
    }

    /// Returns the underlying repository.
    pub fn repository(&mut self) -> &mut StatsRepository {
        &mut self.repository
    }

    /// Consumes the service, returning the repository.
    pub fn into_repository(self) -> StatsRepository {
        self.repository
    }

    /// Stores a replay: its match, its round, each player, and each stat line.
    ///
    /// Matches and rounds are reused when their keys already exist. A stat
    /// line is only reused when every value is identical.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the timestamp is invalid, a lookup is ambiguous,
    /// or a database error occurs. Nothing is written in that case.
    #[instrument(
        skip(self, replay),
        fields(
            league = %replay.league(),
            season = replay.season(),
            match_in_season = replay.match_id(),
            round_in_match = replay.round_id(),
        )
    )]
    pub fn add_replay<R: Replay + ?Sized>(&mut self, replay: &R) -> Result<IngestReport, DbError> {
        let (date, time) = split_utc_timestamp(replay.utc_time())?;
        debug!(%date, %time, rows = replay.metrics().len(), "Ingesting replay");

        let report = self.repository.transaction(|store| {
            let mut report = IngestReport::default();

            let match_key = MatchKey::new(
                replay.league().to_string(),
                replay.season(),
                replay.match_id(),
            );
            let fixture = store.get_or_create_match(&match_key, date)?;
            report.matches.record(&fixture);

            let round_key = RoundKey::new(
                *fixture.row().id(),
                replay.round_id(),
                replay.map_name().to_string(),
                replay.duration_mins(),
                time,
            );
            let round = store.get_or_create_round(&round_key)?;
            report.rounds.record(&round);

            for row in replay.metrics() {
                let player = store.get_or_create_player(row.player_name())?;
                report.players.record(&player);

                let stats_key =
                    PlayerStatsKey::new(*round.row().id(), *player.row().id(), *row.stats());
                let stats = store.get_or_create_player_stats(&stats_key)?;
                report.player_stats.record(&stats);
            }

            Ok(report)
        })?;

        info!(%report, "Replay ingested");
        Ok(report)
    }

    /// Stores a season's weekly scores, one row per player and week.
    ///
    /// If a player already has scores for a week, the stored values are kept
    /// and the new ones are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a lookup is ambiguous or a database error
    /// occurs. Nothing is written in that case.
    #[instrument(skip(self, evaluation), fields(season_id = evaluation.season_id()))]
    pub fn add_scores<S: ScoreEvaluation + ?Sized>(
        &mut self,
        evaluation: &S,
    ) -> Result<IngestReport, DbError> {
        let season = evaluation.season_id();
        debug!(records = evaluation.scores().len(), "Ingesting scores");

        let report = self.repository.transaction(|store| {
            let mut report = IngestReport::default();

            for record in evaluation.scores() {
                let player = store.get_or_create_player(record.player_name())?;
                report.players.record(&player);

                let key = PlayerScoresKey::new(*player.row().id(), season, *record.week());
                let scores = store.get_or_create_player_scores(&key, record.scores())?;
                report.player_scores.record(&scores);
            }

            Ok(report)
        })?;

        info!(%report, "Scores ingested");
        Ok(report)
    }
}
