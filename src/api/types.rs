//! Request and response types for the gateway API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub app: &'static str,
    pub version: &'static str,
}

/// Body of `/api/suggest` and `/api/assist`. The prompt is optional here so
/// that a missing field is reported as our own 400.
#[derive(Deserialize)]
pub struct SuggestRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Serialize)]
pub struct SuggestResponse {
    pub suggestion: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistResponse {
    pub suggestion: String,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct QuotaQuery {
    pub limit: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub gemini_configured: bool,
    pub model: String,
    pub daily_limit: u32,
    pub window_hours: i64,
}
