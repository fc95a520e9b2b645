//! Prediction endpoint

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::db::AppState;
use crate::llm;
use crate::models::CachedPrediction;
use crate::prediction::Prediction;
use crate::store;

use super::{ApiError, UserQuery};

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
  pub next_start: NaiveDate,
  pub period_length: i64,
  pub pms_start: NaiveDate,
  pub pms_end: NaiveDate,
  pub text: String,
}

impl From<Prediction> for PredictionResponse {
  fn from(p: Prediction) -> Self {
    Self {
      next_start: p.next_start,
      period_length: p.period_length,
      pms_start: p.pms_start,
      pms_end: p.pms_end,
      text: p.text,
    }
  }
}

impl From<CachedPrediction> for PredictionResponse {
  fn from(p: CachedPrediction) -> Self {
    Self {
      next_start: p.next_start,
      period_length: p.period_length,
      pms_start: p.pms_start,
      pms_end: p.pms_end,
      text: p.text,
    }
  }
}

/// GET /api/prediction
///
/// Serves a cached prediction while it is fresh; otherwise recomputes
/// (external forecast first, heuristic fallback) and caches the result.
pub async fn get_prediction(
  State(state): State<Arc<AppState>>,
  Query(query): Query<UserQuery>,
) -> Result<Json<PredictionResponse>, ApiError> {
  let user = query.user_or_default();

  if let Some(cached) = store::load_cached_prediction(&state.db, user).await? {
    if cached.is_fresh(Utc::now()) {
      return Ok(Json(cached.into()));
    }
  }

  let records = store::list_periods(&state.db, user).await?;
  let starts: Vec<NaiveDate> = records.iter().map(|r| r.start_date).collect();

  let prediction = llm::forecast_or_fallback(&starts, Utc::now().date_naive()).await;
  store::save_prediction(&state.db, user, &prediction).await?;

  Ok(Json(prediction.into()))
}
