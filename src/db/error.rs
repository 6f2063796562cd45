//! Database error types.

use derive_more::{Display, Error};
use tracing::instrument;

/// What went wrong in the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum DbErrorKind {
    /// A uniqueness lookup matched more than one row.
    ///
    /// The lookup key is supposed to identify at most one row, so this is a
    /// data-integrity fault. It is never retried.
    #[display("Ambiguous entry: {matches} rows in '{table}' match one lookup key")]
    AmbiguousEntry {
        /// Table the lookup ran against.
        table: &'static str,
        /// Number of rows that matched.
        matches: usize,
    },
    /// A query or statement failed inside the engine.
    #[display("Query failed: {_0}")]
    Query(String),
    /// The connection could not be opened.
    #[display("Connection failed: {_0}")]
    Connection(String),
    /// Schema creation failed.
    #[display("Schema migration failed: {_0}")]
    Migration(String),
    /// A replay timestamp does not map onto a calendar date.
    #[display("Timestamp {_0} is outside the supported range")]
    InvalidTimestamp(i64),
    /// A stat or score value is NaN and cannot be stored or matched.
    #[display("Column '{column}' of '{table}' is NaN")]
    NotANumber {
        /// Table the row was meant for.
        table: &'static str,
        /// First column holding NaN.
        column: &'static str,
    },
}

/// Database error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Database error: {} at {}:{}", kind, file, line)]
pub struct DbError {
    /// Error kind.
    pub kind: DbErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl DbError {
    /// Creates a new database error with caller location tracking.
    #[track_caller]
    #[instrument]
    pub fn new(kind: DbErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Creates an [`DbErrorKind::AmbiguousEntry`] error.
    #[track_caller]
    pub fn ambiguous(table: &'static str, matches: usize) -> Self {
        Self::new(DbErrorKind::AmbiguousEntry { table, matches })
    }

    /// Creates a [`DbErrorKind::NotANumber`] error.
    #[track_caller]
    pub fn not_a_number(table: &'static str, column: &'static str) -> Self {
        Self::new(DbErrorKind::NotANumber { table, column })
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &DbErrorKind {
        &self.kind
    }

    /// True when a uniqueness lookup matched several rows.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self.kind, DbErrorKind::AmbiguousEntry { .. })
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::new(DbErrorKind::Query(err.to_string()))
    }
}

impl From<diesel::ConnectionError> for DbError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(DbErrorKind::Connection(err.to_string()))
    }
}
