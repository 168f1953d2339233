//! Unified error handling for the gateway.
//!
//! Every failure the HTTP surface can report maps onto one variant here.
//! Only caller-actionable detail leaves the process: configuration and
//! upstream-shape problems are logged where they happen and answered with a
//! generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Message returned to callers for failures whose detail stays server-side.
pub const GENERIC_SERVER_ERROR: &str = "Internal server error";

/// Unified error type for gateway operations.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The caller sent an unusable request (missing prompt, bad JSON).
    InvalidRequest(String),
    /// The deployment is missing something it needs, e.g. the API key.
    ConfigurationError(String),
    /// Upstream API rejected the call; status and body are passed through.
    UpstreamError { status: u16, body: String },
    /// Upstream API answered 2xx with a payload we could not unwrap.
    UpstreamFormatError(String),
    /// The client has used up its quota window.
    QuotaExceeded {
        limit: u32,
        reset_time: DateTime<Utc>,
    },
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Self::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            Self::UpstreamError { status, body } => {
                write!(f, "Upstream error ({}): {}", status, body)
            }
            Self::UpstreamFormatError(msg) => write!(f, "Unexpected upstream response: {}", msg),
            Self::QuotaExceeded { limit, reset_time } => write!(
                f,
                "Quota of {} requests exhausted, resets at {}",
                limit,
                reset_time.to_rfc3339()
            ),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Error response body. `resetTime` is only present for quota rejections.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponseBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reset_time: Option<DateTime<Utc>>,
}

impl GatewayError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamError { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::UpstreamFormatError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Get the error type string.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::ConfigurationError(_) => "configuration_error",
            Self::UpstreamError { .. } => "upstream_error",
            Self::UpstreamFormatError(_) => "upstream_format_error",
            Self::QuotaExceeded { .. } => "quota_exceeded",
        }
    }

    /// Message safe to show the caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidRequest(msg) => msg.clone(),
            Self::UpstreamError { body, .. } => body.clone(),
            Self::ConfigurationError(_) | Self::UpstreamFormatError(_) => {
                GENERIC_SERVER_ERROR.to_string()
            }
            Self::QuotaExceeded { .. } => self.to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let reset_time = match &self {
            Self::QuotaExceeded { reset_time, .. } => Some(*reset_time),
            _ => None,
        };
        let body = ErrorResponseBody {
            error: self.public_message(),
            reset_time,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_has_correct_status() {
        let err = GatewayError::InvalidRequest("Prompt is required".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_type(), "invalid_request");
        assert_eq!(err.public_message(), "Prompt is required");
    }

    #[test]
    fn configuration_error_hides_detail() {
        let err = GatewayError::ConfigurationError("GEMINI_API_KEY not set".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.public_message().contains("GEMINI"));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn upstream_error_mirrors_status() {
        let err = GatewayError::UpstreamError {
            status: 429,
            body: "Resource exhausted".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.public_message(), "Resource exhausted");
    }

    #[test]
    fn upstream_error_with_invalid_status_falls_back_to_bad_gateway() {
        let err = GatewayError::UpstreamError {
            status: 42,
            body: String::new(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn upstream_format_error_is_500_and_generic() {
        let err = GatewayError::UpstreamFormatError("no candidates".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), GENERIC_SERVER_ERROR);
    }

    #[test]
    fn quota_exceeded_is_429() {
        let err = GatewayError::QuotaExceeded {
            limit: 50,
            reset_time: Utc::now(),
        };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert!(err.to_string().contains("50"));
    }

    #[test]
    fn error_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<GatewayError>();
    }
}
