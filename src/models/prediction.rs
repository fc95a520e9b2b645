use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A cached prediction becomes stale this long after it was generated.
pub const PREDICTION_STALE_HOURS: i64 = 24;

/// Stored prediction row (one per user)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CachedPrediction {
  pub user: String,
  pub next_start: NaiveDate,
  pub pms_start: NaiveDate,
  pub pms_end: NaiveDate,
  pub period_length: i64,
  pub cycle_length: i64,
  pub text: String,
  pub created_at: DateTime<Utc>,
}

impl CachedPrediction {
  pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
    now - self.created_at <= Duration::hours(PREDICTION_STALE_HOURS)
  }
}
