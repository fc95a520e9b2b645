//! Deterministic cycle prediction
//!
//! This module projects the next period start from recorded history.
//! The external forecast path (llm.rs) only ever replaces the projected
//! date and message; the derived windows always come from here.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// Constants
/// ---------------------------------------------------------------------------

/// Assumed cycle length when history is too thin to average.
pub const DEFAULT_CYCLE_DAYS: i64 = 28;

/// Fixed length of a predicted period, in days.
pub const PERIOD_LENGTH_DAYS: i64 = 5;

/// The PMS window opens 7 days and closes 5 days before the predicted start.
const PMS_LEAD_DAYS: i64 = 7;
const PMS_TRAIL_DAYS: i64 = 5;

/// ---------------------------------------------------------------------------
/// Prediction
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
  pub next_start: NaiveDate,
  pub period_length: i64,
  pub pms_start: NaiveDate,
  pub pms_end: NaiveDate,

  /// Cycle length the projection was based on, rounded to whole days
  pub cycle_length: i64,

  /// Human-readable message describing the prediction
  pub text: String,
}

/// Mean gap in days between consecutive starts. None with fewer than 2 dates.
pub fn average_cycle_days(starts: &[NaiveDate]) -> Option<f64> {
  if starts.len() < 2 {
    return None;
  }
  let total: i64 = starts.windows(2).map(|w| (w[1] - w[0]).num_days()).sum();
  Some(total as f64 / (starts.len() - 1) as f64)
}

/// Derive the fixed windows around a projected start date.
pub fn with_windows(next_start: NaiveDate, cycle_length: i64, text: String) -> Prediction {
  Prediction {
    next_start,
    period_length: PERIOD_LENGTH_DAYS,
    pms_start: next_start - Duration::days(PMS_LEAD_DAYS),
    pms_end: next_start - Duration::days(PMS_TRAIL_DAYS),
    cycle_length,
    text,
  }
}

/// Project the next start from sorted history.
///
/// With two or more recorded starts the projection uses the arithmetic mean
/// of consecutive deltas, rounded to the nearest whole day. With one start
/// it assumes a default-length cycle from that start; with none, from
/// `today`. Never fails.
pub fn predict(starts: &[NaiveDate], today: NaiveDate) -> Prediction {
  match (starts.last(), average_cycle_days(starts)) {
    (Some(&last), Some(avg)) => {
      let cycle_length = avg.round() as i64;
      let next_start = last + Duration::days(cycle_length);
      with_windows(
        next_start,
        cycle_length,
        format!(
          "Based on historical average ({:.1} days), next cycle around {}.",
          avg, next_start
        ),
      )
    }
    (Some(&last), None) => {
      let next_start = last + Duration::days(DEFAULT_CYCLE_DAYS);
      with_windows(
        next_start,
        DEFAULT_CYCLE_DAYS,
        format!(
          "Only one recorded cycle; assuming a {}-day cycle, next around {}.",
          DEFAULT_CYCLE_DAYS, next_start
        ),
      )
    }
    (None, _) => {
      let next_start = today + Duration::days(DEFAULT_CYCLE_DAYS);
      with_windows(
        next_start,
        DEFAULT_CYCLE_DAYS,
        format!(
          "No recorded cycles; assuming a {}-day cycle from today, next around {}.",
          DEFAULT_CYCLE_DAYS, next_start
        ),
      )
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
