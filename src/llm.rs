//! LLM integration for cycle forecasting
//!
//! This module handles communication with the Claude API for predicting
//! the next cycle start. The external path is strictly best-effort: one
//! attempt with a bounded timeout, then an unconditional fallback to the
//! local heuristic.

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::prediction::{self, Prediction, DEFAULT_CYCLE_DAYS};

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const MAX_TOKENS: u32 = 256;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum LlmError {
  #[error("API key not configured")]
  MissingApiKey,

  #[error("Request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),
}

/// ---------------------------------------------------------------------------
/// Claude API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ClaudeRequest {
  model: String,
  max_tokens: u32,
  system: String,
  messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
  role: String,
  content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
  content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
  #[serde(rename = "type")]
  content_type: String,
  text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorResponse {
  error: ClaudeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorDetail {
  message: String,
}

/// ---------------------------------------------------------------------------
/// Forecast Reply (from Claude)
/// ---------------------------------------------------------------------------

/// Structured reply the model is instructed to produce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReply {
  pub next_start: NaiveDate,
  pub text: String,
}

/// ---------------------------------------------------------------------------
/// Claude Client
/// ---------------------------------------------------------------------------

pub struct ClaudeClient {
  client: Client,
  api_key: String,
}

impl ClaudeClient {
  /// Create a new Claude client, loading API key from environment
  pub fn from_env() -> Result<Self, LlmError> {
    let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| LlmError::MissingApiKey)?;

    let client = Client::builder()
      .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
      .build()
      .map_err(|e| LlmError::Request(e.to_string()))?;

    Ok(Self { client, api_key })
  }

  /// Call Claude with a system prompt and user message
  async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
    let request = ClaudeRequest {
      model: CLAUDE_MODEL.to_string(),
      max_tokens: MAX_TOKENS,
      system: system_prompt.to_string(),
      messages: vec![ClaudeMessage {
        role: "user".to_string(),
        content: user_message.to_string(),
      }],
    };

    let response = self
      .client
      .post(CLAUDE_API_URL)
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", API_VERSION)
      .header("content-type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    if !status.is_success() {
      // Try to parse error response
      if let Ok(error_resp) = serde_json::from_str::<ClaudeErrorResponse>(&body) {
        return Err(LlmError::Api(error_resp.error.message));
      }
      return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
    }

    let claude_response: ClaudeResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

    claude_response
      .content
      .iter()
      .find(|c| c.content_type == "text")
      .and_then(|c| c.text.clone())
      .ok_or_else(|| LlmError::Parse("No text content in response".to_string()))
  }

  /// Ask the model for the next cycle start given the recorded history.
  ///
  /// The reply must contain a date no earlier than the last recorded
  /// start; anything else counts as malformed.
  pub async fn forecast_next_cycle(
    &self,
    starts: &[NaiveDate],
  ) -> Result<ForecastReply, LlmError> {
    let system_prompt = include_str!("prompts/forecast_system.txt");

    let history = starts
      .iter()
      .map(|d| d.to_string())
      .collect::<Vec<_>>()
      .join("\n");

    let user_message = format!(
      r#"Known period start dates, earliest first:
{}

Respond with valid JSON in this exact format:
{{"next_start": "YYYY-MM-DD", "text": "one short sentence for the user"}}"#,
      history
    );

    let response_text = self.complete(system_prompt, &user_message).await?;
    let json_str = extract_json(&response_text)?;

    let reply: ForecastReply =
      serde_json::from_str(&json_str).map_err(|e| LlmError::Parse(format!("{}: {}", e, json_str)))?;

    if let Some(&last) = starts.last() {
      if reply.next_start < last {
        return Err(LlmError::Parse(format!(
          "predicted date {} precedes last recorded start {}",
          reply.next_start, last
        )));
      }
    }

    Ok(reply)
  }
}

/// ---------------------------------------------------------------------------
/// Fallback Combinator
/// ---------------------------------------------------------------------------

/// Try the model once, then fall back to the local heuristic.
///
/// Forecast failures never reach the caller; they are logged and the
/// heuristic result is returned instead. The PMS window is always derived
/// locally from whichever next-start date wins.
pub async fn forecast_or_fallback(starts: &[NaiveDate], today: NaiveDate) -> Prediction {
  let client = match ClaudeClient::from_env() {
    Ok(client) => client,
    Err(e) => {
      tracing::debug!("external forecast unavailable: {}", e);
      return prediction::predict(starts, today);
    }
  };

  match client.forecast_next_cycle(starts).await {
    Ok(reply) => {
      let cycle_length = starts
        .last()
        .map(|&last| (reply.next_start - last).num_days())
        .unwrap_or(DEFAULT_CYCLE_DAYS);
      prediction::with_windows(reply.next_start, cycle_length, reply.text)
    }
    Err(e) => {
      tracing::warn!("external forecast failed, using heuristic: {}", e);
      prediction::predict(starts, today)
    }
  }
}

/// Extract JSON from Claude's response (handles markdown code blocks)
fn extract_json(text: &str) -> Result<String, LlmError> {
  // Try direct parse first
  if text.trim().starts_with('{') {
    return Ok(text.trim().to_string());
  }

  // Look for JSON in code blocks
  if let Some(start) = text.find("```json") {
    let start = start + 7;
    if let Some(end) = text[start..].find("```") {
      return Ok(text[start..start + end].trim().to_string());
    }
  }

  // Last resort: find first { to last }
  if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
    return Ok(text[start..=end].to_string());
  }

  Err(LlmError::Parse("Could not extract JSON from response".to_string()))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
