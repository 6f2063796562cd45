//! Database persistence layer for match statistics and weekly scores.

mod error;
mod keys;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use error::{DbError, DbErrorKind};
pub use keys::{MatchKey, PlayerKey, PlayerScoresKey, PlayerStatsKey, RoundKey};
pub use models::{
    Entry, Match, NewMatch, NewPlayer, NewPlayerScores, NewPlayerStats, NewRound, Player,
    PlayerScores, PlayerStats, Round, ScoreLine, StatLine,
};
pub use repository::{StatsRepository, StatsSession, StatsStore};
