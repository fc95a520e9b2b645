//! Test utilities and helpers for integration and unit testing
//!
//! Provides in-memory database setup/teardown and small seed helpers.

use chrono::NaiveDate;
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  // Run migrations
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Seed Helpers
/// ---------------------------------------------------------------------------

/// Insert open period starts for one user
pub async fn seed_starts(pool: &SqlitePool, user: &str, starts: &[&str]) {
  for start in starts {
    sqlx::query("INSERT INTO periods (user, start_date) VALUES (?1, ?2)")
      .bind(user)
      .bind(date(start))
      .execute(pool)
      .await
      .expect("Failed to seed period start");
  }
}

/// Parse a test date literal
pub fn date(s: &str) -> NaiveDate {
  s.parse().expect("invalid test date")
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('periods', 'predictions')",
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 2, "Expected periods and predictions tables");

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_starts_inserts_open_records() {
    let pool = setup_test_db().await;

    seed_starts(&pool, "alice", &["2024-01-01", "2024-01-29"]).await;

    let count: i64 =
      sqlx::query_scalar("SELECT COUNT(*) FROM periods WHERE user = 'alice' AND end_date IS NULL")
        .fetch_one(&pool)
        .await
        .expect("Failed to count periods");

    assert_eq!(count, 2);

    teardown_test_db(pool).await;
  }
}
