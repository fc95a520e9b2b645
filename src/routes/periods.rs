//! Period record endpoints

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::AppState;
use crate::models::DEFAULT_USER;
use crate::store;

use super::{ApiError, UserQuery};

/// ---------------------------------------------------------------------------
/// Request / Response Shapes
/// ---------------------------------------------------------------------------

/// Body of POST /api/periods/start and /api/periods/end
#[derive(Debug, Deserialize)]
pub struct PeriodEventBody {
  pub date: Option<String>,
  pub user: Option<String>,
}

impl PeriodEventBody {
  /// Missing or unparseable dates are a caller error, not a server one.
  fn parse_date(&self) -> Result<NaiveDate, ApiError> {
    let raw = self
      .date
      .as_deref()
      .ok_or_else(|| ApiError::Validation("date is required".to_string()))?;
    raw
      .parse()
      .map_err(|_| ApiError::Validation(format!("invalid date: {}", raw)))
  }

  fn user(&self) -> &str {
    self.user.as_deref().unwrap_or(DEFAULT_USER)
  }
}

#[derive(Debug, Serialize)]
pub struct PeriodResponse {
  pub start_date: NaiveDate,
  pub end_date: Option<NaiveDate>,
}

fn parse_path_date(raw: &str) -> Result<NaiveDate, ApiError> {
  raw
    .parse()
    .map_err(|_| ApiError::Validation(format!("invalid date: {}", raw)))
}

/// ---------------------------------------------------------------------------
/// Handlers
/// ---------------------------------------------------------------------------

/// GET /api/periods
pub async fn list(
  State(state): State<Arc<AppState>>,
  Query(query): Query<UserQuery>,
) -> Result<Json<Vec<PeriodResponse>>, ApiError> {
  let records = store::list_periods(&state.db, query.user_or_default()).await?;

  Ok(Json(
    records
      .into_iter()
      .map(|r| PeriodResponse {
        start_date: r.start_date,
        end_date: r.end_date,
      })
      .collect(),
  ))
}

/// POST /api/periods/start
pub async fn add_start(
  State(state): State<Arc<AppState>>,
  Json(body): Json<PeriodEventBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
  let date = body.parse_date()?;
  store::add_start(&state.db, body.user(), date).await?;

  Ok((StatusCode::CREATED, Json(json!({}))))
}

/// DELETE /api/periods/start/{date}
pub async fn remove_start(
  State(state): State<Arc<AppState>>,
  Path(date): Path<String>,
  Query(query): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
  let date = parse_path_date(&date)?;
  store::remove_start(&state.db, query.user_or_default(), date).await?;

  Ok(Json(json!({})))
}

/// POST /api/periods/end
pub async fn close(
  State(state): State<Arc<AppState>>,
  Json(body): Json<PeriodEventBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
  let date = body.parse_date()?;
  store::close_period(&state.db, body.user(), date).await?;

  Ok((StatusCode::CREATED, Json(json!({}))))
}

/// DELETE /api/periods/end/{date}
pub async fn clear_end(
  State(state): State<Arc<AppState>>,
  Path(date): Path<String>,
  Query(query): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
  let date = parse_path_date(&date)?;
  store::clear_end(&state.db, query.user_or_default(), date).await?;

  Ok(Json(json!({})))
}

/// DELETE /api/periods
///
/// No user parameter means a system-wide wipe, not the sentinel user.
pub async fn clear_all(
  State(state): State<Arc<AppState>>,
  Query(query): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
  store::clear_all(&state.db, query.user.as_deref()).await?;

  Ok(Json(json!({})))
}
