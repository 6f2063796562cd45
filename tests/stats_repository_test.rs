//! Tests for get-or-create repository operations.

use chrono::{NaiveDate, NaiveTime};
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use tempfile::NamedTempFile;

use league_stats::{
    DbError, DbErrorKind, MatchKey, PlayerKey, PlayerScoresKey, PlayerStatsKey, RoundKey,
    ScoreLine, StatLine, StatsRepository, StatsStore,
};

#[derive(QueryableByName)]
struct RowCount {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

/// Creates a temporary database file with schema applied, returns the file
/// handle (must stay in scope to keep the file alive) and a ready repository.
fn setup_test_db() -> (NamedTempFile, StatsRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let mut repo = StatsRepository::open_path(&db_path).expect("Failed to open repository");
    repo.create_db().expect("Schema creation failed");
    (db_file, repo)
}

fn count_rows(repo: &mut StatsRepository, table: &str) -> i64 {
    diesel::sql_query(format!("SELECT COUNT(*) AS count FROM {table}"))
        .get_result::<RowCount>(repo.connection())
        .expect("Count failed")
        .count
}

fn match_key() -> MatchKey {
    MatchKey::new("Heroes Lounge".to_string(), 12, 4)
}

fn match_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 9).expect("Valid date")
}

fn round_time() -> NaiveTime {
    NaiveTime::from_hms_opt(19, 30, 5).expect("Valid time")
}

fn stat_line(kills: f64) -> StatLine {
    StatLine::new(true, kills, 2.0, 9.0, 0.31, 14_250.5, 30_010.0)
}

fn score_line(total: f64) -> ScoreLine {
    ScoreLine::new(4.0, -1.5, 3.0, 2.25, 1.0, 0.5, 2.0, 0.0, 1.0, total)
}

/// Inserts a match and a round, returning (match id, round id).
fn seed_round(repo: &mut StatsRepository) -> (i32, i32) {
    let fixture = repo
        .get_or_create_match(&match_key(), match_date())
        .expect("Match failed")
        .into_row();
    let key = RoundKey::new(*fixture.id(), 1, "Cursed Hollow".to_string(), 18, round_time());
    let round = repo.get_or_create_round(&key).expect("Round failed").into_row();
    (*fixture.id(), *round.id())
}

#[test]
fn test_create_db_is_idempotent() {
    let (_db, mut repo) = setup_test_db();
    repo.create_db().expect("Second create_db failed");
    assert_eq!(count_rows(&mut repo, "players"), 0);
}

#[test]
fn test_in_memory_database() {
    let mut repo = StatsRepository::open_path(":memory:").expect("Open failed");
    repo.create_db().expect("Schema creation failed");
    let player = repo.get_or_create_player("Solo").expect("Create failed");
    assert!(!player.exists());
    assert_eq!(repo.location(), ":memory:");
}

#[test]
fn test_get_or_create_player_reuses_existing() {
    let (_db, mut repo) = setup_test_db();

    let first = repo.get_or_create_player("Alice").expect("Create failed");
    assert!(!first.exists());
    assert_eq!(first.row().name(), "Alice");
    assert!(*first.row().id() > 0);

    let second = repo.get_or_create_player("Alice").expect("Lookup failed");
    assert!(second.exists());
    assert_eq!(second.row(), first.row());
    assert_eq!(count_rows(&mut repo, "players"), 1);
}

#[test]
fn test_get_or_create_match_twice_inserts_once() {
    let (_db, mut repo) = setup_test_db();

    let first = repo
        .get_or_create_match(&match_key(), match_date())
        .expect("Create failed");
    let second = repo
        .get_or_create_match(&match_key(), match_date())
        .expect("Lookup failed");

    assert!(!first.exists());
    assert!(second.exists());
    assert_eq!(first.row().id(), second.row().id());
    assert_eq!(count_rows(&mut repo, "matches"), 1);
}

#[test]
fn test_get_or_create_match_ignores_date_for_identity() {
    let (_db, mut repo) = setup_test_db();

    repo.get_or_create_match(&match_key(), match_date())
        .expect("Create failed");
    let later = NaiveDate::from_ymd_opt(2024, 3, 16).expect("Valid date");
    let again = repo
        .get_or_create_match(&match_key(), later)
        .expect("Lookup failed");

    assert!(again.exists());
    assert_eq!(*again.row().date(), match_date());
}

#[test]
fn test_get_or_create_match_distinct_keys() {
    let (_db, mut repo) = setup_test_db();

    let a = repo
        .get_or_create_match(&MatchKey::new("Heroes Lounge".to_string(), 12, 4), match_date())
        .expect("Create failed");
    let b = repo
        .get_or_create_match(&MatchKey::new("Heroes Lounge".to_string(), 12, 5), match_date())
        .expect("Create failed");
    let c = repo
        .get_or_create_match(&MatchKey::new("Nexus Cup".to_string(), 12, 4), match_date())
        .expect("Create failed");

    assert!(!a.exists() && !b.exists() && !c.exists());
    assert_eq!(count_rows(&mut repo, "matches"), 3);
}

#[test]
fn test_get_or_create_round_is_idempotent() {
    let (_db, mut repo) = setup_test_db();
    let (match_id, round_id) = seed_round(&mut repo);

    let key = RoundKey::new(match_id, 1, "Cursed Hollow".to_string(), 18, round_time());
    let again = repo.get_or_create_round(&key).expect("Lookup failed");

    assert!(again.exists());
    assert_eq!(*again.row().id(), round_id);
    assert_eq!(count_rows(&mut repo, "rounds"), 1);
}

#[test]
fn test_get_or_create_round_differs_on_any_key_column() {
    let (_db, mut repo) = setup_test_db();
    let (match_id, _) = seed_round(&mut repo);

    let other_map = RoundKey::new(match_id, 1, "Towers of Doom".to_string(), 18, round_time());
    let other_duration = RoundKey::new(match_id, 1, "Cursed Hollow".to_string(), 19, round_time());
    let other_time = RoundKey::new(
        match_id,
        1,
        "Cursed Hollow".to_string(),
        18,
        NaiveTime::from_hms_opt(20, 0, 0).expect("Valid time"),
    );

    for key in [other_map, other_duration, other_time] {
        let entry = repo.get_or_create_round(&key).expect("Create failed");
        assert!(!entry.exists(), "{key:?} should be a new round");
    }
    assert_eq!(count_rows(&mut repo, "rounds"), 4);
}

#[test]
fn test_get_or_create_round_requires_existing_match() {
    let (_db, mut repo) = setup_test_db();

    let key = RoundKey::new(999, 1, "Cursed Hollow".to_string(), 18, round_time());
    let result = repo.get_or_create_round(&key);

    let err = result.expect_err("Foreign key should reject orphan round");
    assert!(matches!(err.kind(), DbErrorKind::Query(_)));
}

#[test]
fn test_player_stats_identical_line_is_reused() {
    let (_db, mut repo) = setup_test_db();
    let (_, round_id) = seed_round(&mut repo);
    let player = repo.get_or_create_player("Alice").expect("Player failed").into_row();

    let key = PlayerStatsKey::new(round_id, *player.id(), stat_line(5.0));
    let first = repo.get_or_create_player_stats(&key).expect("Create failed");
    let second = repo.get_or_create_player_stats(&key).expect("Lookup failed");

    assert!(!first.exists());
    assert!(second.exists());
    assert_eq!(first.row().id(), second.row().id());
    assert_eq!(count_rows(&mut repo, "player_statistics"), 1);
}

#[test]
fn test_player_stats_different_line_same_round_and_player_is_duplicated() {
    let (_db, mut repo) = setup_test_db();
    let (_, round_id) = seed_round(&mut repo);
    let player = repo.get_or_create_player("Alice").expect("Player failed").into_row();

    let first = repo
        .get_or_create_player_stats(&PlayerStatsKey::new(round_id, *player.id(), stat_line(5.0)))
        .expect("Create failed");
    let second = repo
        .get_or_create_player_stats(&PlayerStatsKey::new(round_id, *player.id(), stat_line(6.0)))
        .expect("Create failed");

    assert!(!first.exists());
    assert!(!second.exists());
    assert_ne!(first.row().id(), second.row().id());
    assert_eq!(count_rows(&mut repo, "player_statistics"), 2);
    assert_eq!(second.row().stat_line(), stat_line(6.0));
}

#[test]
fn test_find_player_stats_matches_whole_line() {
    let (_db, mut repo) = setup_test_db();
    let (_, round_id) = seed_round(&mut repo);
    let player = repo.get_or_create_player("Alice").expect("Player failed").into_row();

    let key = PlayerStatsKey::new(round_id, *player.id(), stat_line(5.0));
    assert!(repo.find_player_stats(&key).expect("Query failed").is_none());
    assert_eq!(count_rows(&mut repo, "player_statistics"), 0);

    let stored = repo.get_or_create_player_stats(&key).expect("Create failed").into_row();
    let found = repo.find_player_stats(&key).expect("Query failed");
    assert_eq!(found, Some(stored));

    let other = PlayerStatsKey::new(round_id, *player.id(), stat_line(5.5));
    assert!(repo.find_player_stats(&other).expect("Query failed").is_none());
}

#[test]
fn test_player_stats_nan_is_rejected() {
    let (_db, mut repo) = setup_test_db();
    let (_, round_id) = seed_round(&mut repo);
    let player = repo.get_or_create_player("Alice").expect("Player failed").into_row();

    let line = StatLine::new(true, 4.0, f64::NAN, 9.0, 0.31, 14_250.5, 30_010.0);
    let err = repo
        .get_or_create_player_stats(&PlayerStatsKey::new(round_id, *player.id(), line))
        .expect_err("NaN must be rejected");

    assert_eq!(
        *err.kind(),
        DbErrorKind::NotANumber {
            table: "player_statistics",
            column: "deaths"
        }
    );
    assert_eq!(count_rows(&mut repo, "player_statistics"), 0);
}

#[test]
fn test_player_scores_nan_is_rejected() {
    let (_db, mut repo) = setup_test_db();
    let player = repo.get_or_create_player("Bob").expect("Player failed").into_row();

    let key = PlayerScoresKey::new(*player.id(), 3, 1);
    let err = repo
        .get_or_create_player_scores(&key, &score_line(f64::NAN))
        .expect_err("NaN must be rejected");

    assert_eq!(
        *err.kind(),
        DbErrorKind::NotANumber {
            table: "player_scores",
            column: "total"
        }
    );
    assert_eq!(count_rows(&mut repo, "player_scores"), 0);
}

#[test]
fn test_player_scores_first_write_wins() {
    let (_db, mut repo) = setup_test_db();
    let player = repo.get_or_create_player("Bob").expect("Player failed").into_row();
    let key = PlayerScoresKey::new(*player.id(), 3, 1);

    let first = repo
        .get_or_create_player_scores(&key, &score_line(10.0))
        .expect("Create failed");
    let second = repo
        .get_or_create_player_scores(&key, &score_line(99.0))
        .expect("Lookup failed");

    assert!(!first.exists());
    assert!(second.exists());
    assert_eq!(first.row().id(), second.row().id());
    assert_eq!(*second.row().total(), 10.0);
    assert_eq!(second.row().score_line(), score_line(10.0));
    assert_eq!(count_rows(&mut repo, "player_scores"), 1);
}

#[test]
fn test_player_scores_distinct_weeks_and_seasons() {
    let (_db, mut repo) = setup_test_db();
    let player = repo.get_or_create_player("Bob").expect("Player failed").into_row();

    for (season, week) in [(3, 1), (3, 2), (4, 1)] {
        let key = PlayerScoresKey::new(*player.id(), season, week);
        let entry = repo
            .get_or_create_player_scores(&key, &score_line(1.0))
            .expect("Create failed");
        assert!(!entry.exists());
    }
    assert_eq!(count_rows(&mut repo, "player_scores"), 3);
}

#[test]
fn test_ambiguous_player_is_rejected() {
    let (_db, mut repo) = setup_test_db();
    diesel::sql_query("INSERT INTO players (name) VALUES ('Twin'), ('Twin')")
        .execute(repo.connection())
        .expect("Direct insert failed");

    let err = repo
        .get_or_create_player("Twin")
        .expect_err("Two matching rows must be ambiguous");

    assert!(err.is_ambiguous());
    assert_eq!(
        *err.kind(),
        DbErrorKind::AmbiguousEntry {
            table: "players",
            matches: 2
        }
    );
    assert_eq!(count_rows(&mut repo, "players"), 2);
}

#[test]
fn test_ambiguous_player_scores_are_rejected() {
    let (_db, mut repo) = setup_test_db();
    let player = repo.get_or_create_player("Bob").expect("Player failed").into_row();
    let key = PlayerScoresKey::new(*player.id(), 3, 1);
    repo.get_or_create_player_scores(&key, &score_line(10.0))
        .expect("Create failed");

    diesel::sql_query(format!(
        "INSERT INTO player_scores (player_id, season, week, kills, deaths, assists, \
         exp_per_min, healing, damage_soaked, winner, under_10_mins, under_15_mins, total) \
         VALUES ({}, 3, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 7)",
        player.id()
    ))
    .execute(repo.connection())
    .expect("Direct insert failed");

    let err = repo
        .get_or_create_player_scores(&key, &score_line(20.0))
        .expect_err("Two matching rows must be ambiguous");
    assert!(err.is_ambiguous());

    let found = repo.find_player_scores(&key);
    assert!(found.is_err_and(|e| e.is_ambiguous()));
}

#[test]
fn test_find_does_not_insert() {
    let (_db, mut repo) = setup_test_db();

    let missing = repo
        .find_player(&PlayerKey::new("Ghost".to_string()))
        .expect("Query failed");
    assert!(missing.is_none());
    assert!(repo.find_match(&match_key()).expect("Query failed").is_none());
    assert_eq!(count_rows(&mut repo, "players"), 0);
    assert_eq!(count_rows(&mut repo, "matches"), 0);

    let (match_id, round_id) = seed_round(&mut repo);
    let found = repo.find_match(&match_key()).expect("Query failed");
    assert_eq!(found.map(|m| *m.id()), Some(match_id));

    let key = RoundKey::new(match_id, 1, "Cursed Hollow".to_string(), 18, round_time());
    let round = repo.find_round(&key).expect("Query failed");
    assert_eq!(round.map(|r| *r.id()), Some(round_id));
}

#[test]
fn test_relationship_navigation() {
    let (_db, mut repo) = setup_test_db();
    let (match_id, round_id) = seed_round(&mut repo);
    let alice = repo.get_or_create_player("Alice").expect("Player failed").into_row();
    let bob = repo.get_or_create_player("Bob").expect("Player failed").into_row();

    for player in [&alice, &bob] {
        let key = PlayerStatsKey::new(round_id, *player.id(), stat_line(3.0));
        repo.get_or_create_player_stats(&key).expect("Stats failed");
    }
    for week in [2, 1] {
        repo.get_or_create_player_scores(
            &PlayerScoresKey::new(*alice.id(), 3, week),
            &score_line(f64::from(week)),
        )
        .expect("Scores failed");
    }

    let fixture = repo
        .find_match(&match_key())
        .expect("Query failed")
        .expect("Match missing");
    let rounds = repo.rounds_of_match(&fixture).expect("Rounds failed");
    assert_eq!(rounds.len(), 1);
    assert_eq!(*rounds[0].id(), round_id);

    let parent = repo.match_of_round(&rounds[0]).expect("Parent failed");
    assert_eq!(*parent.id(), match_id);

    let round_stats = repo.stats_of_round(&rounds[0]).expect("Stats failed");
    let player_ids: Vec<i32> = round_stats.iter().map(|s| *s.player_id()).collect();
    assert_eq!(player_ids, [*alice.id(), *bob.id()]);

    let bob_stats = repo.stats_of_player(&bob).expect("Stats failed");
    assert_eq!(bob_stats.len(), 1);

    let weeks: Vec<i32> = repo
        .scores_of_player(&alice)
        .expect("Scores failed")
        .iter()
        .map(|s| *s.week())
        .collect();
    assert_eq!(weeks, [1, 2]);
    assert!(repo.scores_of_player(&bob).expect("Scores failed").is_empty());

    assert_eq!(repo.player_by_id(*bob.id()).expect("Query failed"), Some(bob));
    assert_eq!(repo.player_by_id(9_999).expect("Query failed"), None);
}

#[test]
fn test_transaction_rolls_back_on_error() {
    let (_db, mut repo) = setup_test_db();

    let result: Result<(), DbError> = repo.transaction(|store| {
        store.get_or_create_player("Temporary")?;
        Err(DbError::new(DbErrorKind::Query("forced failure".to_string())))
    });
    assert!(result.is_err());

    let found = repo
        .find_player(&PlayerKey::new("Temporary".to_string()))
        .expect("Query failed");
    assert!(found.is_none());
}

#[test]
fn test_transaction_commits_on_success() {
    let (_db, mut repo) = setup_test_db();

    let id = repo
        .transaction(|store| {
            let player = store.get_or_create_player("Kept")?;
            let again = store.get_or_create_player("Kept")?;
            assert!(again.exists());
            Ok(*player.row().id())
        })
        .expect("Transaction failed");

    let found = repo
        .find_player(&PlayerKey::new("Kept".to_string()))
        .expect("Query failed");
    assert_eq!(found.map(|p| *p.id()), Some(id));
}
