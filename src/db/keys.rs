//! Uniqueness keys.
//!
//! Each key names the columns that decide whether two rows describe the same
//! real-world entity. A lookup compares every listed column for equality and
//! nothing else.

use chrono::NaiveTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use tracing::{instrument, warn};

use crate::db::{
    DbError, Match, NewMatch, NewPlayer, NewPlayerScores, NewPlayerStats, NewRound, Player,
    PlayerScores, PlayerStats, Round, StatLine, schema,
};

/// A typed lookup against one table.
pub(crate) trait LookupKey {
    /// Row type the key identifies.
    type Row;

    /// Table name used in diagnostics.
    const TABLE: &'static str;

    /// Loads every row whose key columns equal this key.
    fn load_matches(&self, conn: &mut SqliteConnection) -> QueryResult<Vec<Self::Row>>;
}

/// A candidate row that can be persisted, returning the stored row.
pub(crate) trait Candidate {
    /// Row type produced by the insert.
    type Row;

    /// Inserts the candidate and returns it with its assigned id.
    fn insert(&self, conn: &mut SqliteConnection) -> QueryResult<Self::Row>;
}

/// Runs the key's lookup and enforces that at most one row matches.
///
/// # Errors
///
/// Returns an ambiguous-entry [`DbError`] if several rows match.
#[instrument(skip(conn, key), fields(table = K::TABLE))]
pub(crate) fn find_unique<K: LookupKey>(
    conn: &mut SqliteConnection,
    key: &K,
) -> Result<Option<K::Row>, DbError> {
    let mut rows = key.load_matches(conn)?;
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        n => {
            warn!(table = K::TABLE, matches = n, "Lookup key matched several rows");
            Err(DbError::ambiguous(K::TABLE, n))
        }
    }
}

/// Player key: the display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, new, Getters)]
pub struct PlayerKey {
    name: String,
}

impl LookupKey for PlayerKey {
    type Row = Player;
    const TABLE: &'static str = "players";

    fn load_matches(&self, conn: &mut SqliteConnection) -> QueryResult<Vec<Player>> {
        use schema::players::dsl::*;
        players
            .filter(name.eq(&self.name))
            .select(Player::as_select())
            .load(conn)
    }
}

impl Candidate for NewPlayer {
    type Row = Player;

    fn insert(&self, conn: &mut SqliteConnection) -> QueryResult<Player> {
        diesel::insert_into(schema::players::table)
            .values(self)
            .returning(Player::as_returning())
            .get_result(conn)
    }
}

/// Match key: league, season and position in the season.
///
/// The match date is not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, new, Getters)]
pub struct MatchKey {
    league: String,
    season: i32,
    match_in_season: i32,
}

impl LookupKey for MatchKey {
    type Row = Match;
    const TABLE: &'static str = "matches";

    fn load_matches(&self, conn: &mut SqliteConnection) -> QueryResult<Vec<Match>> {
        use schema::matches::dsl::*;
        matches
            .filter(league.eq(&self.league))
            .filter(season.eq(self.season))
            .filter(match_in_season.eq(self.match_in_season))
            .select(Match::as_select())
            .load(conn)
    }
}

impl Candidate for NewMatch {
    type Row = Match;

    fn insert(&self, conn: &mut SqliteConnection) -> QueryResult<Match> {
        diesel::insert_into(schema::matches::table)
            .values(self)
            .returning(Match::as_returning())
            .get_result(conn)
    }
}

/// Round key: every round column except the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, new, Getters)]
pub struct RoundKey {
    match_id: i32,
    round_in_match: i32,
    map_name: String,
    duration: i32,
    time: NaiveTime,
}

impl RoundKey {
    /// Builds the insert candidate this key describes.
    pub fn candidate(&self) -> NewRound {
        NewRound::new(
            self.match_id,
            self.round_in_match,
            self.map_name.clone(),
            self.duration,
            self.time,
        )
    }
}

impl LookupKey for RoundKey {
    type Row = Round;
    const TABLE: &'static str = "rounds";

    fn load_matches(&self, conn: &mut SqliteConnection) -> QueryResult<Vec<Round>> {
        use schema::rounds::dsl::*;
        rounds
            .filter(match_id.eq(self.match_id))
            .filter(round_in_match.eq(self.round_in_match))
            .filter(map_name.eq(&self.map_name))
            .filter(duration.eq(self.duration))
            .filter(time.eq(self.time))
            .select(Round::as_select())
            .load(conn)
    }
}

impl Candidate for NewRound {
    type Row = Round;

    fn insert(&self, conn: &mut SqliteConnection) -> QueryResult<Round> {
        diesel::insert_into(schema::rounds::table)
            .values(self)
            .returning(Round::as_returning())
            .get_result(conn)
    }
}

/// Player statistics key: round, player and the full stat line.
///
/// Two different stat lines for the same round and player are two different
/// keys, so both get stored.
#[derive(Debug, Clone, PartialEq, new, Getters)]
pub struct PlayerStatsKey {
    round_id: i32,
    player_id: i32,
    line: StatLine,
}

impl PlayerStatsKey {
    /// Builds the insert candidate this key describes.
    pub fn candidate(&self) -> NewPlayerStats {
        NewPlayerStats::new(self.round_id, self.player_id, self.line)
    }
}

impl LookupKey for PlayerStatsKey {
    type Row = PlayerStats;
    const TABLE: &'static str = "player_statistics";

    fn load_matches(&self, conn: &mut SqliteConnection) -> QueryResult<Vec<PlayerStats>> {
        use schema::player_statistics::dsl::*;
        let line = &self.line;
        player_statistics
            .filter(round_id.eq(self.round_id))
            .filter(player_id.eq(self.player_id))
            .filter(winner_team.eq(*line.winner_team()))
            .filter(kills.eq(*line.kills()))
            .filter(deaths.eq(*line.deaths()))
            .filter(assists.eq(*line.assists()))
            .filter(exp_contrib.eq(*line.exp_contrib()))
            .filter(healing.eq(*line.healing()))
            .filter(damage_soaked.eq(*line.damage_soaked()))
            .select(PlayerStats::as_select())
            .load(conn)
    }
}

impl Candidate for NewPlayerStats {
    type Row = PlayerStats;

    fn insert(&self, conn: &mut SqliteConnection) -> QueryResult<PlayerStats> {
        diesel::insert_into(schema::player_statistics::table)
            .values(self)
            .returning(PlayerStats::as_returning())
            .get_result(conn)
    }
}

/// Player scores key: player, season and week. Score values are not part of
/// the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, new, Getters)]
pub struct PlayerScoresKey {
    player_id: i32,
    season: i32,
    week: i32,
}

impl LookupKey for PlayerScoresKey {
    type Row = PlayerScores;
    const TABLE: &'static str = "player_scores";

    fn load_matches(&self, conn: &mut SqliteConnection) -> QueryResult<Vec<PlayerScores>> {
        use schema::player_scores::dsl::*;
        player_scores
            .filter(player_id.eq(self.player_id))
            .filter(season.eq(self.season))
            .filter(week.eq(self.week))
            .select(PlayerScores::as_select())
            .load(conn)
    }
}

impl Candidate for NewPlayerScores {
    type Row = PlayerScores;

    fn insert(&self, conn: &mut SqliteConnection) -> QueryResult<PlayerScores> {
        diesel::insert_into(schema::player_scores::table)
            .values(self)
            .returning(PlayerScores::as_returning())
            .get_result(conn)
    }
}
