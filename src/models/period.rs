use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentinel user for single-user deployments that never send a user id.
pub const DEFAULT_USER: &str = "default";

/// One reported cycle. Open until an end date is matched to it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PeriodRecord {
  pub user: String,
  pub start_date: NaiveDate,
  pub end_date: Option<NaiveDate>,
}

impl PeriodRecord {
  pub fn is_open(&self) -> bool {
    self.end_date.is_none()
  }
}
