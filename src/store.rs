//! Cycle record store
//!
//! Owns the `periods` table and the end-date matching rule. All writes go
//! straight to SQLite; there is no in-memory copy of the records.

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::db::DbPool;
use crate::models::{CachedPrediction, PeriodRecord};
use crate::prediction::Prediction;

/// Furthest a reported end date may trail its start and still close it.
pub const END_MATCH_WINDOW_DAYS: i64 = 7;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("no open period start within 7 days before {0}")]
  NoMatchingStart(NaiveDate),

  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

/// ---------------------------------------------------------------------------
/// Period Records
/// ---------------------------------------------------------------------------

/// All periods for one user, earliest start first.
pub async fn list_periods(db: &DbPool, user: &str) -> Result<Vec<PeriodRecord>, StoreError> {
  let records = sqlx::query_as::<_, PeriodRecord>(
    "SELECT user, start_date, end_date FROM periods WHERE user = ?1 ORDER BY start_date",
  )
  .bind(user)
  .fetch_all(db)
  .await?;

  Ok(records)
}

/// Record a period start. Inserting the same (user, start) twice is a no-op.
pub async fn add_start(db: &DbPool, user: &str, date: NaiveDate) -> Result<(), StoreError> {
  sqlx::query(
    "INSERT INTO periods (user, start_date) VALUES (?1, ?2) \
     ON CONFLICT (user, start_date) DO NOTHING",
  )
  .bind(user)
  .bind(date)
  .execute(db)
  .await?;

  invalidate_prediction(db, user).await
}

/// Delete a start. Succeeds whether or not a matching record existed.
pub async fn remove_start(db: &DbPool, user: &str, date: NaiveDate) -> Result<(), StoreError> {
  sqlx::query("DELETE FROM periods WHERE user = ?1 AND start_date = ?2")
    .bind(user)
    .bind(date)
    .execute(db)
    .await?;

  invalidate_prediction(db, user).await
}

/// Attach an end date to the user's earliest open start that lies no more
/// than [`END_MATCH_WINDOW_DAYS`] before it (both boundaries inclusive).
///
/// An end date before every open start, or more than the window past the
/// nearest, closes nothing and is an error. This is a business rule, not a
/// closest-date heuristic.
pub async fn close_period(db: &DbPool, user: &str, end_date: NaiveDate) -> Result<(), StoreError> {
  let open_starts: Vec<(NaiveDate,)> = sqlx::query_as(
    "SELECT start_date FROM periods WHERE user = ?1 AND end_date IS NULL ORDER BY start_date",
  )
  .bind(user)
  .fetch_all(db)
  .await?;

  let matched = open_starts
    .iter()
    .map(|(start,)| *start)
    .find(|start| {
      let days = (end_date - *start).num_days();
      (0..=END_MATCH_WINDOW_DAYS).contains(&days)
    })
    .ok_or(StoreError::NoMatchingStart(end_date))?;

  sqlx::query("UPDATE periods SET end_date = ?1 WHERE user = ?2 AND start_date = ?3")
    .bind(end_date)
    .bind(user)
    .bind(matched)
    .execute(db)
    .await?;

  invalidate_prediction(db, user).await
}

/// Detach an end date from whichever of the user's records holds it.
pub async fn clear_end(db: &DbPool, user: &str, end_date: NaiveDate) -> Result<(), StoreError> {
  sqlx::query("UPDATE periods SET end_date = NULL WHERE user = ?1 AND end_date = ?2")
    .bind(user)
    .bind(end_date)
    .execute(db)
    .await?;

  invalidate_prediction(db, user).await
}

/// Wipe one user's records, or every record when no user is given.
pub async fn clear_all(db: &DbPool, user: Option<&str>) -> Result<(), StoreError> {
  match user {
    Some(user) => {
      sqlx::query("DELETE FROM periods WHERE user = ?1")
        .bind(user)
        .execute(db)
        .await?;
      invalidate_prediction(db, user).await
    }
    None => {
      sqlx::query("DELETE FROM periods").execute(db).await?;
      sqlx::query("DELETE FROM predictions").execute(db).await?;
      Ok(())
    }
  }
}

/// ---------------------------------------------------------------------------
/// Prediction Cache
/// ---------------------------------------------------------------------------

pub async fn load_cached_prediction(
  db: &DbPool,
  user: &str,
) -> Result<Option<CachedPrediction>, StoreError> {
  let row = sqlx::query_as::<_, CachedPrediction>(
    "SELECT user, next_start, pms_start, pms_end, period_length, cycle_length, text, created_at \
     FROM predictions WHERE user = ?1",
  )
  .bind(user)
  .fetch_optional(db)
  .await?;

  Ok(row)
}

pub async fn save_prediction(
  db: &DbPool,
  user: &str,
  prediction: &Prediction,
) -> Result<(), StoreError> {
  sqlx::query(
    r#"
    INSERT INTO predictions (
      user, next_start, pms_start, pms_end, period_length, cycle_length, text, created_at
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(user) DO UPDATE SET
      next_start = excluded.next_start,
      pms_start = excluded.pms_start,
      pms_end = excluded.pms_end,
      period_length = excluded.period_length,
      cycle_length = excluded.cycle_length,
      text = excluded.text,
      created_at = excluded.created_at
    "#,
  )
  .bind(user)
  .bind(prediction.next_start)
  .bind(prediction.pms_start)
  .bind(prediction.pms_end)
  .bind(prediction.period_length)
  .bind(prediction.cycle_length)
  .bind(&prediction.text)
  .bind(Utc::now())
  .execute(db)
  .await?;

  Ok(())
}

/// Any write to a user's periods makes their cached prediction invalid.
async fn invalidate_prediction(db: &DbPool, user: &str) -> Result<(), StoreError> {
  sqlx::query("DELETE FROM predictions WHERE user = ?1")
    .bind(user)
    .execute(db)
    .await?;

  Ok(())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::prediction;
  use crate::test_utils::*;

  #[tokio::test]
  async fn test_add_start_is_idempotent() {
    let pool = setup_test_db().await;

    add_start(&pool, "alice", date("2024-01-01")).await.unwrap();
    add_start(&pool, "alice", date("2024-01-01")).await.unwrap();

    let records = list_periods(&pool, "alice").await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_open());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_list_is_sorted_ascending() {
    let pool = setup_test_db().await;
    seed_starts(&pool, "alice", &["2024-03-01", "2024-01-01", "2024-02-01"]).await;

    let records = list_periods(&pool, "alice").await.unwrap();
    let starts: Vec<_> = records.iter().map(|r| r.start_date).collect();
    assert_eq!(
      starts,
      vec![date("2024-01-01"), date("2024-02-01"), date("2024-03-01")]
    );

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_remove_start_missing_record_is_ok() {
    let pool = setup_test_db().await;

    let result = remove_start(&pool, "alice", date("2024-01-01")).await;
    assert!(result.is_ok());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_close_period_window_boundary_inclusive() {
    let pool = setup_test_db().await;
    seed_starts(&pool, "alice", &["2024-01-01"]).await;

    // Exactly 7 days out still matches
    close_period(&pool, "alice", date("2024-01-08")).await.unwrap();

    let records = list_periods(&pool, "alice").await.unwrap();
    assert_eq!(records[0].end_date, Some(date("2024-01-08")));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_close_period_same_day() {
    let pool = setup_test_db().await;
    seed_starts(&pool, "alice", &["2024-01-01"]).await;

    close_period(&pool, "alice", date("2024-01-01")).await.unwrap();

    let records = list_periods(&pool, "alice").await.unwrap();
    assert_eq!(records[0].end_date, Some(date("2024-01-01")));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_close_period_beyond_window_fails() {
    let pool = setup_test_db().await;
    seed_starts(&pool, "alice", &["2024-01-01"]).await;

    let result = close_period(&pool, "alice", date("2024-01-10")).await;
    assert!(matches!(result, Err(StoreError::NoMatchingStart(_))));

    // Record stays open
    let records = list_periods(&pool, "alice").await.unwrap();
    assert!(records[0].is_open());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_close_period_before_all_starts_fails() {
    let pool = setup_test_db().await;
    seed_starts(&pool, "alice", &["2024-01-10"]).await;

    let result = close_period(&pool, "alice", date("2024-01-05")).await;
    assert!(matches!(result, Err(StoreError::NoMatchingStart(_))));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_close_period_earliest_open_start_wins() {
    let pool = setup_test_db().await;
    seed_starts(&pool, "alice", &["2024-01-01", "2024-01-05"]).await;

    // Both opens are within 7 days of the end date; the earliest takes it
    close_period(&pool, "alice", date("2024-01-07")).await.unwrap();

    let records = list_periods(&pool, "alice").await.unwrap();
    assert_eq!(records[0].end_date, Some(date("2024-01-07")));
    assert!(records[1].is_open());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_close_period_skips_already_closed() {
    let pool = setup_test_db().await;
    seed_starts(&pool, "alice", &["2024-01-01", "2024-01-05"]).await;

    close_period(&pool, "alice", date("2024-01-04")).await.unwrap();
    close_period(&pool, "alice", date("2024-01-09")).await.unwrap();

    let records = list_periods(&pool, "alice").await.unwrap();
    assert_eq!(records[0].end_date, Some(date("2024-01-04")));
    assert_eq!(records[1].end_date, Some(date("2024-01-09")));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_clear_end_reopens_record() {
    let pool = setup_test_db().await;
    seed_starts(&pool, "alice", &["2024-01-01"]).await;
    close_period(&pool, "alice", date("2024-01-05")).await.unwrap();

    clear_end(&pool, "alice", date("2024-01-05")).await.unwrap();

    let records = list_periods(&pool, "alice").await.unwrap();
    assert!(records[0].is_open());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_clear_all_scoped_to_user() {
    let pool = setup_test_db().await;
    seed_starts(&pool, "alice", &["2024-01-01"]).await;
    seed_starts(&pool, "bob", &["2024-02-01"]).await;

    clear_all(&pool, Some("alice")).await.unwrap();

    assert!(list_periods(&pool, "alice").await.unwrap().is_empty());
    assert_eq!(list_periods(&pool, "bob").await.unwrap().len(), 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_clear_all_without_user_wipes_everything() {
    let pool = setup_test_db().await;
    seed_starts(&pool, "alice", &["2024-01-01"]).await;
    seed_starts(&pool, "bob", &["2024-02-01"]).await;

    clear_all(&pool, None).await.unwrap();

    assert!(list_periods(&pool, "alice").await.unwrap().is_empty());
    assert!(list_periods(&pool, "bob").await.unwrap().is_empty());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_prediction_cache_roundtrip() {
    let pool = setup_test_db().await;

    let computed = prediction::predict(&[date("2024-01-01")], date("2024-01-15"));
    save_prediction(&pool, "alice", &computed).await.unwrap();

    let cached = load_cached_prediction(&pool, "alice").await.unwrap().unwrap();
    assert_eq!(cached.next_start, computed.next_start);
    assert_eq!(cached.period_length, 5);
    assert_eq!(cached.text, computed.text);
    assert!(cached.is_fresh(Utc::now()));

    assert!(load_cached_prediction(&pool, "bob").await.unwrap().is_none());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_period_writes_invalidate_cached_prediction() {
    let pool = setup_test_db().await;

    let computed = prediction::predict(&[date("2024-01-01")], date("2024-01-15"));
    save_prediction(&pool, "alice", &computed).await.unwrap();

    add_start(&pool, "alice", date("2024-02-01")).await.unwrap();
    assert!(load_cached_prediction(&pool, "alice").await.unwrap().is_none());

    // Other users' caches are untouched
    save_prediction(&pool, "alice", &computed).await.unwrap();
    save_prediction(&pool, "bob", &computed).await.unwrap();
    remove_start(&pool, "alice", date("2024-02-01")).await.unwrap();
    assert!(load_cached_prediction(&pool, "alice").await.unwrap().is_none());
    assert!(load_cached_prediction(&pool, "bob").await.unwrap().is_some());

    teardown_test_db(pool).await;
  }
}
