//! Exchange log lines with configurable verbosity levels.
//!
//! Supports three verbosity levels:
//! - Minimal: One-liner nginx-style
//! - Compact: Two-line request/response
//! - Verbose: Full block with quota details

use crate::config::LogVerbosity;
use chrono::{DateTime, Utc};

/// Summary of one gateway exchange, built by the handlers.
#[derive(Debug, Clone)]
pub struct ExchangeRecord {
    pub id: String,
    pub path: String,
    pub client_id: Option<String>,
    pub prompt_chars: usize,
    pub status: u16,
    pub duration_ms: u64,
    pub quota_remaining: Option<u32>,
    pub reset_time: Option<DateTime<Utc>>,
}

impl ExchangeRecord {
    pub fn new(path: impl Into<String>, client_id: Option<&str>, prompt_chars: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            path: path.into(),
            client_id: client_id.map(str::to_string),
            prompt_chars,
            status: 0,
            duration_ms: 0,
            quota_remaining: None,
            reset_time: None,
        }
    }
}

/// Format duration in human-readable form.
fn format_duration(ms: u64) -> String {
    if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}ms", ms)
    }
}

fn status_text(status: u16) -> &'static str {
    if (200..300).contains(&status) { "OK" } else { "ERROR" }
}

/// Format an exchange for the log.
pub fn format_exchange(record: &ExchangeRecord, verbosity: &LogVerbosity) -> String {
    match verbosity {
        LogVerbosity::Minimal => format_minimal(record),
        LogVerbosity::Compact => format_compact(record),
        LogVerbosity::Verbose => format_verbose(record),
    }
}

fn format_minimal(record: &ExchangeRecord) -> String {
    let client = record.client_id.as_deref().unwrap_or("-");
    format!(
        "POST {} {} {} {}",
        record.path,
        record.status,
        format_duration(record.duration_ms),
        client
    )
}

fn format_compact(record: &ExchangeRecord) -> String {
    let client = record
        .client_id
        .as_deref()
        .map(|c| format!(" [{}]", c))
        .unwrap_or_default();
    let request_line = format!(
        "→ POST {}{} ({} chars)",
        record.path, client, record.prompt_chars
    );

    let remaining = record
        .quota_remaining
        .map(|r| format!(", {} left", r))
        .unwrap_or_default();
    let response_line = format!(
        "← {} {} ({}{})",
        record.status,
        status_text(record.status),
        format_duration(record.duration_ms),
        remaining
    );

    format!("{}\n{}", request_line, response_line)
}

fn format_verbose(record: &ExchangeRecord) -> String {
    let separator = "────────────────────────────────────────";
    let remaining = record
        .quota_remaining
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".to_string());
    let reset = record
        .reset_time
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{separator}\n\
         POST {path}\n\
         Request: {id}\n\
         Client: {client}\n\
         Prompt: {chars} chars\n\
         Status: {status} {status_text}\n\
         Timing: {duration}\n\
         Quota: {remaining} remaining, resets {reset}\n\
         {separator}",
        separator = separator,
        path = record.path,
        id = record.id,
        client = record.client_id.as_deref().unwrap_or("-"),
        chars = record.prompt_chars,
        status = record.status,
        status_text = status_text(record.status),
        duration = format_duration(record.duration_ms),
        remaining = remaining,
        reset = reset,
    )
}
