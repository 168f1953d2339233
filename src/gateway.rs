//! Gateway to the external generative-text API.
//!
//! One prompt in, one suggestion out. Each call is a single round trip with
//! no retry, no backoff and no streaming. Quota accounting is left to the
//! caller, who should only count calls that returned `Ok`.

use crate::config::Config;
use crate::error::GatewayError;
use crate::http::create_client_with_timeout;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Header carrying the API key on outbound requests.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the upstream `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        }
    }

    /// Build a client from the upstream and API key sections of `config`.
    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        let client = create_client_with_timeout(Duration::from_secs(config.upstream.timeout_secs))?;
        Ok(Self::new(
            client,
            config.upstream.base_url.clone(),
            config.upstream.model.clone(),
            config.api_keys.gemini.clone(),
        ))
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full URL of the generation endpoint.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Forward `prompt` upstream and return the suggestion text.
    ///
    /// The prompt is validated before the credential, and both before any
    /// network traffic.
    pub async fn suggest(&self, prompt: Option<&str>) -> Result<String, GatewayError> {
        let prompt = validate_prompt(prompt)?;

        let api_key = match self.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => key,
            None => {
                tracing::error!("No upstream API key configured; set GEMINI_API_KEY");
                return Err(GatewayError::ConfigurationError(
                    "upstream API key is not configured".to_string(),
                ));
            }
        };

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&build_request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Upstream request failed: {}", e);
                GatewayError::UpstreamError {
                    status: 502,
                    body: "Upstream request failed".to_string(),
                }
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Upstream rejected request: {}", text);
            return Err(GatewayError::UpstreamError {
                status: status.as_u16(),
                body: text,
            });
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            tracing::error!(payload = %text, "Upstream returned non-JSON body: {}", e);
            GatewayError::UpstreamFormatError(format!("invalid JSON: {}", e))
        })?;

        let suggestion = extract_suggestion(&body).ok_or_else(|| {
            tracing::error!(payload = %text, "Upstream response missing candidates[0].content.parts[0].text");
            GatewayError::UpstreamFormatError("missing suggestion text".to_string())
        })?;

        if suggestion.is_empty() {
            // Empty text falls back to the prompt itself.
            tracing::warn!("Upstream returned empty suggestion; echoing prompt");
            return Ok(prompt.to_string());
        }

        Ok(suggestion.to_string())
    }
}

/// Reject absent or blank prompts.
pub fn validate_prompt(prompt: Option<&str>) -> Result<&str, GatewayError> {
    match prompt {
        Some(p) if !p.trim().is_empty() => Ok(p),
        _ => Err(GatewayError::InvalidRequest("Prompt is required".to_string())),
    }
}

/// Single-turn request envelope with the prompt as its only part.
pub fn build_request_body(prompt: &str) -> Value {
    json!({
        "contents": [
            { "parts": [ { "text": prompt } ] }
        ]
    })
}

/// Pull `candidates[0].content.parts[0].text` out of a response body.
pub fn extract_suggestion(body: &Value) -> Option<&str> {
    body.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
}
