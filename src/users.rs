//! External user directory integration
//!
//! The /api/users endpoint proxies a directory service configured through
//! the environment. The upstream payload is passed through untouched.

use reqwest::Client;
use serde_json::Value;
use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct UserDirectoryConfig {
  pub base_url: Url,
  pub token: Option<String>,
}

impl UserDirectoryConfig {
  pub fn from_env() -> Result<Self, UsersError> {
    let raw = env::var("USER_DIRECTORY_URL")
      .map_err(|_| UsersError::MissingConfig("USER_DIRECTORY_URL".into()))?;
    let base_url = Url::parse(&raw)
      .map_err(|e| UsersError::MissingConfig(format!("USER_DIRECTORY_URL: {}", e)))?;

    Ok(Self {
      base_url,
      token: env::var("USER_DIRECTORY_TOKEN").ok(),
    })
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum UsersError {
  #[error("User directory not configured: {0}")]
  MissingConfig(String),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Upstream error: {0}")]
  Upstream(String),
}

/// ---------------------------------------------------------------------------
/// Directory Fetch
/// ---------------------------------------------------------------------------

/// Fetch the raw user list from the configured directory service.
pub async fn fetch_users(config: &UserDirectoryConfig) -> Result<Value, UsersError> {
  let client = Client::builder()
    .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    .build()?;

  let mut request = client.get(config.base_url.clone());
  if let Some(token) = &config.token {
    request = request.bearer_auth(token);
  }

  let response = request.send().await?;

  if !response.status().is_success() {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    return Err(UsersError::Upstream(format!("HTTP {}: {}", status, body)));
  }

  Ok(response.json().await?)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
