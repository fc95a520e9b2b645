//! User directory endpoint

use axum::Json;
use serde_json::Value;

use crate::users::{fetch_users, UserDirectoryConfig};

use super::ApiError;

/// GET /api/users
///
/// Proxies the configured external directory. Configuration is read per
/// request; an unconfigured directory is a 500, matching the source.
pub async fn list_users() -> Result<Json<Value>, ApiError> {
  let config = UserDirectoryConfig::from_env()?;
  let users = fetch_users(&config).await?;

  Ok(Json(users))
}
