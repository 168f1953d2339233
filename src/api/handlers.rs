//! HTTP handlers for the gateway API.

use super::types::*;
use super::AppState;
use crate::error::GatewayError;
use crate::gateway::validate_prompt;
use crate::logger::{format_exchange, ExchangeRecord};
use crate::quota::{QuotaCheck, QuotaStatus};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

// ============================================================================
// Health and settings
// ============================================================================

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        app: "quillgate",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        gemini_configured: state.gateway.has_credential(),
        model: state.gateway.model().to_string(),
        daily_limit: state.daily_limit,
        window_hours: state.quota.window().num_hours(),
    })
}

// ============================================================================
// Helpers
// ============================================================================

/// Unwrap a JSON body, turning extractor rejections into our 400.
fn parse_body(body: Result<Json<SuggestRequest>, JsonRejection>) -> Result<SuggestRequest, GatewayError> {
    body.map(|Json(req)| req)
        .map_err(|e| GatewayError::InvalidRequest(e.body_text()))
}

/// Finish the exchange log record and build the response.
fn finish<T: Serialize>(
    state: &AppState,
    mut record: ExchangeRecord,
    started: Instant,
    result: Result<T, GatewayError>,
) -> Response {
    record.duration_ms = started.elapsed().as_millis() as u64;
    let response = match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            tracing::debug!(request_id = %record.id, error_type = e.error_type(), "{}", e);
            e.into_response()
        }
    };
    record.status = response.status().as_u16();
    tracing::info!("{}", format_exchange(&record, &state.verbosity));
    response
}

/// Resolve `?limit=`, turning extractor rejections into our 400.
fn resolve_limit(
    state: &AppState,
    query: Result<Query<QuotaQuery>, QueryRejection>,
) -> Result<u32, GatewayError> {
    let Query(query) = query.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    Ok(query.limit.unwrap_or(state.daily_limit))
}

// ============================================================================
// Gateway handlers
// ============================================================================

/// Forward a prompt upstream. Quota is not touched.
pub async fn suggest(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SuggestRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request = parse_body(body);
    let prompt_chars = request
        .as_ref()
        .ok()
        .and_then(|r| r.prompt.as_deref())
        .map_or(0, |p| p.chars().count());
    let record = ExchangeRecord::new("/api/suggest", None, prompt_chars);

    let result = match request {
        Ok(req) => state
            .gateway
            .suggest(req.prompt.as_deref())
            .await
            .map(|suggestion| SuggestResponse { suggestion }),
        Err(e) => Err(e),
    };

    finish(&state, record, started, result)
}

/// Check quota, forward the prompt, and count the call only if it succeeded.
pub async fn assist(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
    body: Result<Json<SuggestRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request = parse_body(body);
    let prompt_chars = request
        .as_ref()
        .ok()
        .and_then(|r| r.prompt.as_deref())
        .map_or(0, |p| p.chars().count());
    let mut record = ExchangeRecord::new(
        format!("/api/assist/{}", client_id),
        Some(&client_id),
        prompt_chars,
    );

    let result = run_assist(&state, &client_id, request).await;
    if let Ok(ref body) = result {
        record.quota_remaining = Some(body.remaining);
        record.reset_time = Some(body.reset_time);
    }

    finish(&state, record, started, result)
}

async fn run_assist(
    state: &AppState,
    client_id: &str,
    request: Result<SuggestRequest, GatewayError>,
) -> Result<AssistResponse, GatewayError> {
    let request = request?;
    let prompt = validate_prompt(request.prompt.as_deref())?;

    let check = state.quota.check_quota(client_id, state.daily_limit);
    if !check.allowed {
        return Err(GatewayError::QuotaExceeded {
            limit: state.daily_limit,
            reset_time: check.reset_time,
        });
    }

    let suggestion = state.gateway.suggest(Some(prompt)).await?;
    state.quota.increment_quota(client_id);
    let status = state.quota.get_status(client_id, state.daily_limit);

    Ok(AssistResponse {
        suggestion,
        remaining: status.remaining,
        reset_time: status.reset_time,
    })
}

// ============================================================================
// Quota handlers
// ============================================================================

pub async fn get_quota(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
    query: Result<Query<QuotaQuery>, QueryRejection>,
) -> Result<Json<QuotaStatus>, GatewayError> {
    let limit = resolve_limit(&state, query)?;
    Ok(Json(state.quota.get_status(&client_id, limit)))
}

pub async fn check_quota(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
    query: Result<Query<QuotaQuery>, QueryRejection>,
) -> Result<Json<QuotaCheck>, GatewayError> {
    let limit = resolve_limit(&state, query)?;
    Ok(Json(state.quota.check_quota(&client_id, limit)))
}

pub async fn increment_quota(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
    query: Result<Query<QuotaQuery>, QueryRejection>,
) -> Result<Json<QuotaStatus>, GatewayError> {
    let limit = resolve_limit(&state, query)?;
    state.quota.increment_quota(&client_id);
    Ok(Json(state.quota.get_status(&client_id, limit)))
}
