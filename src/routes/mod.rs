//! HTTP router construction and shared handler plumbing.
//!
//! One thin handler per endpoint; the store and predictor do the work.

pub mod periods;
pub mod prediction;
pub mod users;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::db::AppState;
use crate::models::DEFAULT_USER;
use crate::store::StoreError;
use crate::users::UsersError;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(health))
    .route(
      "/api/periods",
      get(periods::list).delete(periods::clear_all),
    )
    .route("/api/periods/start", post(periods::add_start))
    .route("/api/periods/start/{date}", delete(periods::remove_start))
    .route("/api/periods/end", post(periods::close))
    .route("/api/periods/end/{date}", delete(periods::clear_end))
    .route("/api/prediction", get(prediction::get_prediction))
    .route("/api/users", get(users::list_users))
    .layer(CorsLayer::permissive())
    .with_state(state)
}

/// ---------------------------------------------------------------------------
/// Error Mapping
/// ---------------------------------------------------------------------------

/// Error envelope returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
  pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
  Validation(String),
  NotFound(String),
  Internal(String),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      ApiError::Validation(m) => (StatusCode::BAD_REQUEST, m),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
      ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
      tracing::error!("request failed: {}", message);
    }

    (status, Json(ErrorBody { error: message })).into_response()
  }
}

impl From<StoreError> for ApiError {
  fn from(e: StoreError) -> Self {
    match e {
      StoreError::NoMatchingStart(_) => ApiError::NotFound(e.to_string()),
      StoreError::Database(_) => ApiError::Internal(e.to_string()),
    }
  }
}

impl From<UsersError> for ApiError {
  fn from(e: UsersError) -> Self {
    ApiError::Internal(e.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Shared Extractors
/// ---------------------------------------------------------------------------

/// The optional ?user= query parameter carried by most endpoints
#[derive(Debug, Deserialize)]
pub struct UserQuery {
  pub user: Option<String>,
}

impl UserQuery {
  /// Single-user deployments omit the parameter and get the sentinel.
  pub fn user_or_default(&self) -> &str {
    self.user.as_deref().unwrap_or(DEFAULT_USER)
  }
}

/// ---------------------------------------------------------------------------
/// Health
/// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
  status: &'static str,
  version: &'static str,
}

async fn health(State(_state): State<Arc<AppState>>) -> Json<HealthResponse> {
  Json(HealthResponse {
    status: "ok",
    version: env!("CARGO_PKG_VERSION"),
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
