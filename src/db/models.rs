//! Database models and domain types.

use chrono::{NaiveDate, NaiveTime};
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::schema;

/// Player database model. Players are identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::players)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Player {
    id: i32,
    name: String,
}

/// Insertable player candidate.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::players)]
pub struct NewPlayer {
    name: String,
}

/// Match database model. One league fixture, made of several rounds.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::matches)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Match {
    id: i32,
    league: String,
    season: i32,
    match_in_season: i32,
    date: NaiveDate,
}

/// Insertable match candidate.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::matches)]
pub struct NewMatch {
    league: String,
    season: i32,
    match_in_season: i32,
    date: NaiveDate,
}

/// Round database model. A single played game inside a match.
#[derive(
    Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Associations, Selectable, Getters,
)]
#[diesel(table_name = schema::rounds)]
#[diesel(belongs_to(Match, foreign_key = match_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Round {
    id: i32,
    match_id: i32,
    round_in_match: i32,
    map_name: String,
    /// Round length in whole minutes.
    duration: i32,
    /// UTC time of day the round was played.
    time: NaiveTime,
}

/// Insertable round candidate.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::rounds)]
pub struct NewRound {
    match_id: i32,
    round_in_match: i32,
    map_name: String,
    duration: i32,
    time: NaiveTime,
}

/// One player's stat line for one round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, new, Getters)]
pub struct StatLine {
    winner_team: bool,
    kills: f64,
    deaths: f64,
    assists: f64,
    exp_contrib: f64,
    healing: f64,
    damage_soaked: f64,
}

impl StatLine {
    /// Names the first value that is NaN, if any.
    pub fn nan_column(&self) -> Option<&'static str> {
        [
            ("kills", self.kills),
            ("deaths", self.deaths),
            ("assists", self.assists),
            ("exp_contrib", self.exp_contrib),
            ("healing", self.healing),
            ("damage_soaked", self.damage_soaked),
        ]
        .into_iter()
        .find_map(|(column, value)| value.is_nan().then_some(column))
    }
}

/// Per-round player statistics database model.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::player_statistics)]
#[diesel(belongs_to(Round, foreign_key = round_id))]
#[diesel(belongs_to(Player, foreign_key = player_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PlayerStats {
    id: i32,
    round_id: i32,
    player_id: i32,
    winner_team: bool,
    kills: f64,
    deaths: f64,
    assists: f64,
    exp_contrib: f64,
    healing: f64,
    damage_soaked: f64,
}

impl PlayerStats {
    /// Returns the stored values as a [`StatLine`].
    pub fn stat_line(&self) -> StatLine {
        StatLine::new(
            self.winner_team,
            self.kills,
            self.deaths,
            self.assists,
            self.exp_contrib,
            self.healing,
            self.damage_soaked,
        )
    }
}

/// Insertable player statistics candidate.
#[derive(Debug, Clone, Insertable, Getters)]
#[diesel(table_name = schema::player_statistics)]
pub struct NewPlayerStats {
    round_id: i32,
    player_id: i32,
    winner_team: bool,
    kills: f64,
    deaths: f64,
    assists: f64,
    exp_contrib: f64,
    healing: f64,
    damage_soaked: f64,
}

impl NewPlayerStats {
    /// Builds a candidate row linking a player and a round.
    pub fn new(round_id: i32, player_id: i32, line: StatLine) -> Self {
        Self {
            round_id,
            player_id,
            winner_team: line.winner_team,
            kills: line.kills,
            deaths: line.deaths,
            assists: line.assists,
            exp_contrib: line.exp_contrib,
            healing: line.healing,
            damage_soaked: line.damage_soaked,
        }
    }
}

/// One player's weekly fantasy score breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, new, Getters)]
pub struct ScoreLine {
    kills: f64,
    deaths: f64,
    assists: f64,
    exp_per_min: f64,
    healing: f64,
    damage_soaked: f64,
    winner: f64,
    under_10_mins: f64,
    under_15_mins: f64,
    total: f64,
}

impl ScoreLine {
    /// Names the first value that is NaN, if any.
    pub fn nan_column(&self) -> Option<&'static str> {
        [
            ("kills", self.kills),
            ("deaths", self.deaths),
            ("assists", self.assists),
            ("exp_per_min", self.exp_per_min),
            ("healing", self.healing),
            ("damage_soaked", self.damage_soaked),
            ("winner", self.winner),
            ("under_10_mins", self.under_10_mins),
            ("under_15_mins", self.under_15_mins),
            ("total", self.total),
        ]
        .into_iter()
        .find_map(|(column, value)| value.is_nan().then_some(column))
    }
}

/// Weekly player scores database model.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::player_scores)]
#[diesel(belongs_to(Player, foreign_key = player_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PlayerScores {
    id: i32,
    player_id: i32,
    season: i32,
    week: i32,
    kills: f64,
    deaths: f64,
    assists: f64,
    exp_per_min: f64,
    healing: f64,
    damage_soaked: f64,
    winner: f64,
    under_10_mins: f64,
    under_15_mins: f64,
    total: f64,
}

impl PlayerScores {
    /// Returns the stored values as a [`ScoreLine`].
    pub fn score_line(&self) -> ScoreLine {
        ScoreLine::new(
            self.kills,
            self.deaths,
            self.assists,
            self.exp_per_min,
            self.healing,
            self.damage_soaked,
            self.winner,
            self.under_10_mins,
            self.under_15_mins,
            self.total,
        )
    }
}

/// Insertable player scores candidate.
#[derive(Debug, Clone, Insertable, Getters)]
#[diesel(table_name = schema::player_scores)]
pub struct NewPlayerScores {
    player_id: i32,
    season: i32,
    week: i32,
    kills: f64,
    deaths: f64,
    assists: f64,
    exp_per_min: f64,
    healing: f64,
    damage_soaked: f64,
    winner: f64,
    under_10_mins: f64,
    under_15_mins: f64,
    total: f64,
}

impl NewPlayerScores {
    /// Builds a candidate row for one player-week.
    pub fn new(player_id: i32, season: i32, week: i32, line: ScoreLine) -> Self {
        Self {
            player_id,
            season,
            week,
            kills: line.kills,
            deaths: line.deaths,
            assists: line.assists,
            exp_per_min: line.exp_per_min,
            healing: line.healing,
            damage_soaked: line.damage_soaked,
            winner: line.winner,
            under_10_mins: line.under_10_mins,
            under_15_mins: line.under_15_mins,
            total: line.total,
        }
    }
}

/// Outcome of a get-or-create call: the canonical row, and whether it was
/// already stored.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry<T> {
    /// The row was found; the candidate was discarded.
    Existing(T),
    /// The candidate was inserted.
    Created(T),
}

impl<T> Entry<T> {
    /// True if the row existed before the call.
    pub fn exists(&self) -> bool {
        matches!(self, Self::Existing(_))
    }

    /// Borrows the canonical row.
    pub fn row(&self) -> &T {
        match self {
            Self::Existing(row) | Self::Created(row) => row,
        }
    }

    /// Consumes the entry, returning the canonical row.
    pub fn into_row(self) -> T {
        match self {
            Self::Existing(row) | Self::Created(row) => row,
        }
    }
}
