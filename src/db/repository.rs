//! Database repository for match statistics and weekly scores.

use std::fmt;

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument, warn};

use crate::config::{Backend, StorageConfig};
use crate::db::keys::{Candidate, LookupKey, find_unique};
use crate::db::{
    DbError, DbErrorKind, Entry, Match, MatchKey, NewMatch, NewPlayer, NewPlayerScores, Player,
    PlayerKey, PlayerScores, PlayerScoresKey, PlayerStats, PlayerStatsKey, Round, RoundKey,
    ScoreLine, schema,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Looks the key up and inserts the candidate only when nothing matches.
fn find_or_insert<K, C>(
    conn: &mut SqliteConnection,
    key: &K,
    candidate: C,
) -> Result<Entry<K::Row>, DbError>
where
    K: LookupKey,
    C: Candidate<Row = K::Row>,
{
    if let Some(row) = find_unique(conn, key)? {
        debug!(table = K::TABLE, "Existing row reused");
        return Ok(Entry::Existing(row));
    }

    let row = candidate.insert(conn)?;
    debug!(table = K::TABLE, "Candidate inserted");
    Ok(Entry::Created(row))
}

/// Get-or-create and navigation operations over one SQLite connection.
///
/// Implemented by [`StatsRepository`], where every call commits on its own,
/// and by [`StatsSession`], where calls share the enclosing transaction.
pub trait StatsStore {
    /// Returns the underlying connection.
    fn connection(&mut self) -> &mut SqliteConnection;

    /// Returns the player with this name, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if several players share the name or a database error occurs.
    #[instrument(skip(self))]
    fn get_or_create_player(&mut self, name: &str) -> Result<Entry<Player>, DbError> {
        let key = PlayerKey::new(name.to_string());
        let entry = find_or_insert(self.connection(), &key, NewPlayer::new(name.to_string()))?;
        if !entry.exists() {
            info!(player_id = entry.row().id(), name = %name, "Player created");
        }
        Ok(entry)
    }

    /// Returns the match for `key`, creating it with `date` if absent.
    ///
    /// An existing match is returned unchanged even if its date differs.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the key is ambiguous or a database error occurs.
    #[instrument(skip(self))]
    fn get_or_create_match(
        &mut self,
        key: &MatchKey,
        date: NaiveDate,
    ) -> Result<Entry<Match>, DbError> {
        let candidate = NewMatch::new(
            key.league().clone(),
            *key.season(),
            *key.match_in_season(),
            date,
        );
        let entry = find_or_insert(self.connection(), key, candidate)?;
        if !entry.exists() {
            info!(match_id = entry.row().id(), league = %key.league(), "Match created");
        }
        Ok(entry)
    }

    /// Returns the round for `key`, creating it under its match if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the key is ambiguous, the match does not exist,
    /// or a database error occurs.
    #[instrument(skip(self))]
    fn get_or_create_round(&mut self, key: &RoundKey) -> Result<Entry<Round>, DbError> {
        let entry = find_or_insert(self.connection(), key, key.candidate())?;
        if !entry.exists() {
            info!(
                round_id = entry.row().id(),
                match_id = entry.row().match_id(),
                map = %entry.row().map_name(),
                "Round created"
            );
        }
        Ok(entry)
    }

    /// Returns the stat row matching the whole key, creating it if absent.
    ///
    /// Only an identical stat line is reused. A different line for the same
    /// round and player is stored as a new row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a value is NaN, the key is ambiguous, a
    /// referenced row is missing, or a database error occurs.
    #[instrument(skip(self))]
    fn get_or_create_player_stats(
        &mut self,
        key: &PlayerStatsKey,
    ) -> Result<Entry<PlayerStats>, DbError> {
        if let Some(column) = key.line().nan_column() {
            warn!(column, "Rejecting stat line with NaN value");
            return Err(DbError::not_a_number(PlayerStatsKey::TABLE, column));
        }
        let entry = find_or_insert(self.connection(), key, key.candidate())?;
        if !entry.exists() {
            info!(
                stats_id = entry.row().id(),
                round_id = key.round_id(),
                player_id = key.player_id(),
                "Player stats created"
            );
        }
        Ok(entry)
    }

    /// Returns the scores for a player-week, creating them from `line` if absent.
    ///
    /// When a row already exists for the key, it is returned verbatim and
    /// `line` is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a value is NaN, the key is ambiguous, the
    /// player is missing, or a database error occurs.
    #[instrument(skip(self, line))]
    fn get_or_create_player_scores(
        &mut self,
        key: &PlayerScoresKey,
        line: &ScoreLine,
    ) -> Result<Entry<PlayerScores>, DbError> {
        if let Some(column) = line.nan_column() {
            warn!(column, "Rejecting score line with NaN value");
            return Err(DbError::not_a_number(PlayerScoresKey::TABLE, column));
        }
        let candidate = NewPlayerScores::new(*key.player_id(), *key.season(), *key.week(), *line);
        let entry = find_or_insert(self.connection(), key, candidate)?;
        if entry.exists() {
            debug!(scores_id = entry.row().id(), "Scores already stored for this week");
        } else {
            info!(
                scores_id = entry.row().id(),
                player_id = key.player_id(),
                week = key.week(),
                "Player scores created"
            );
        }
        Ok(entry)
    }

    /// Finds a player by name without inserting.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if several players share the name or a database error occurs.
    #[instrument(skip(self))]
    fn find_player(&mut self, key: &PlayerKey) -> Result<Option<Player>, DbError> {
        find_unique(self.connection(), key)
    }

    /// Finds a match without inserting.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the key is ambiguous or a database error occurs.
    #[instrument(skip(self))]
    fn find_match(&mut self, key: &MatchKey) -> Result<Option<Match>, DbError> {
        find_unique(self.connection(), key)
    }

    /// Finds a round without inserting.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the key is ambiguous or a database error occurs.
    #[instrument(skip(self))]
    fn find_round(&mut self, key: &RoundKey) -> Result<Option<Round>, DbError> {
        find_unique(self.connection(), key)
    }

    /// Finds a stat row without inserting.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the key is ambiguous or a database error occurs.
    #[instrument(skip(self))]
    fn find_player_stats(&mut self, key: &PlayerStatsKey) -> Result<Option<PlayerStats>, DbError> {
        find_unique(self.connection(), key)
    }

    /// Finds a player-week scores row without inserting.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the key is ambiguous or a database error occurs.
    #[instrument(skip(self))]
    fn find_player_scores(
        &mut self,
        key: &PlayerScoresKey,
    ) -> Result<Option<PlayerScores>, DbError> {
        find_unique(self.connection(), key)
    }

    /// Gets a player by id. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    fn player_by_id(&mut self, player_id: i32) -> Result<Option<Player>, DbError> {
        let player = schema::players::table
            .find(player_id)
            .select(Player::as_select())
            .first(self.connection())
            .optional()?;
        Ok(player)
    }

    /// Gets the match a round belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, round), fields(round_id = round.id()))]
    fn match_of_round(&mut self, round: &Round) -> Result<Match, DbError> {
        let parent = schema::matches::table
            .find(*round.match_id())
            .select(Match::as_select())
            .first(self.connection())?;
        Ok(parent)
    }

    /// Lists the rounds of a match in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, parent), fields(match_id = parent.id()))]
    fn rounds_of_match(&mut self, parent: &Match) -> Result<Vec<Round>, DbError> {
        let rounds = Round::belonging_to(parent)
            .select(Round::as_select())
            .order(schema::rounds::id.asc())
            .load(self.connection())?;
        debug!(count = rounds.len(), "Rounds loaded");
        Ok(rounds)
    }

    /// Lists the stat rows recorded for a round in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, round), fields(round_id = round.id()))]
    fn stats_of_round(&mut self, round: &Round) -> Result<Vec<PlayerStats>, DbError> {
        let stats = PlayerStats::belonging_to(round)
            .select(PlayerStats::as_select())
            .order(schema::player_statistics::id.asc())
            .load(self.connection())?;
        debug!(count = stats.len(), "Round stats loaded");
        Ok(stats)
    }

    /// Lists every stat row recorded for a player in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, player), fields(player_id = player.id()))]
    fn stats_of_player(&mut self, player: &Player) -> Result<Vec<PlayerStats>, DbError> {
        let stats = PlayerStats::belonging_to(player)
            .select(PlayerStats::as_select())
            .order(schema::player_statistics::id.asc())
            .load(self.connection())?;
        debug!(count = stats.len(), "Player stats loaded");
        Ok(stats)
    }

    /// Lists a player's weekly scores ordered by season, then week.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, player), fields(player_id = player.id()))]
    fn scores_of_player(&mut self, player: &Player) -> Result<Vec<PlayerScores>, DbError> {
        let scores = PlayerScores::belonging_to(player)
            .select(PlayerScores::as_select())
            .order((
                schema::player_scores::season.asc(),
                schema::player_scores::week.asc(),
                schema::player_scores::id.asc(),
            ))
            .load(self.connection())?;
        debug!(count = scores.len(), "Player scores loaded");
        Ok(scores)
    }
}

/// Storage gateway holding one SQLite connection for its whole lifetime.
///
/// Outside [`StatsRepository::transaction`] each write commits on its own.
pub struct StatsRepository {
    conn: SqliteConnection,
    location: String,
}

impl fmt::Debug for StatsRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsRepository")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl StatsRepository {
    /// Opens the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection cannot be established.
    #[instrument(skip(config), fields(path = %config.database_path(), backend = %config.backend()))]
    pub fn open(config: &StorageConfig) -> Result<Self, DbError> {
        let location = config.database_path().clone();
        let mut conn = match config.backend() {
            Backend::Sqlite => SqliteConnection::establish(&location).map_err(|e| {
                DbError::new(DbErrorKind::Connection(format!(
                    "Failed to connect to '{}': {}",
                    location, e
                )))
            })?,
        };

        diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut conn)?;

        info!(path = %location, "StatsRepository opened");
        Ok(Self { conn, location })
    }

    /// Opens an SQLite store at `path`.
    ///
    /// Use `":memory:"` for an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection cannot be established.
    #[instrument]
    pub fn open_path(path: &str) -> Result<Self, DbError> {
        Self::open(&StorageConfig::new(path.to_string()))
    }

    /// Returns the storage location this repository was opened with.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Creates every table that does not exist yet. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if schema creation fails.
    #[instrument(skip(self), fields(path = %self.location))]
    pub fn create_db(&mut self) -> Result<(), DbError> {
        let applied = self
            .conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(DbErrorKind::Migration(e.to_string())))?;
        info!(applied = applied.len(), "Schema ready");
        Ok(())
    }

    /// Runs `f` inside one immediate transaction.
    ///
    /// Everything `f` writes is committed together when it returns `Ok`, and
    /// rolled back when it returns `Err`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`, or [`DbError`] if the transaction
    /// cannot begin or commit.
    #[instrument(skip(self, f), fields(path = %self.location))]
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut StatsSession<'_>) -> Result<T, DbError>,
    {
        self.conn
            .immediate_transaction(|conn| f(&mut StatsSession { conn }))
    }
}

impl StatsStore for StatsRepository {
    fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

/// A [`StatsStore`] bound to an open transaction.
pub struct StatsSession<'c> {
    conn: &'c mut SqliteConnection,
}

impl fmt::Debug for StatsSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsSession").finish_non_exhaustive()
    }
}

impl StatsStore for StatsSession<'_> {
    fn connection(&mut self) -> &mut SqliteConnection {
        &mut *self.conn
    }
}
