//! Per-client request quota over a rolling window.
//!
//! Each client gets a counter and a reset deadline stored as JSON under
//! `ai_quota:<client_id>`. The window starts at first use and, once it has
//! elapsed, the next call starts a fresh one (not calendar-aligned).
//!
//! Storage problems never block a caller: unreadable state is treated as a
//! fresh window and failed writes are only logged. Read-modify-write is not
//! atomic, so concurrent calls for the same client may race.

use crate::storage::KeyValueStore;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default number of upstream calls per window.
pub const DEFAULT_LIMIT: u32 = 50;

/// Default window length in hours.
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

const KEY_PREFIX: &str = "ai_quota:";

/// Persisted counter for one client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotaState {
    pub count: u32,
    pub reset_time: DateTime<Utc>,
}

impl QuotaState {
    fn fresh(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            count: 0,
            reset_time: now + window,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.reset_time
    }
}

/// How [`QuotaTracker::load`] obtained the state it returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadOutcome {
    /// Stored state is live.
    Current,
    /// State was missing, corrupt or expired; a fresh window stands in.
    Replaced,
    /// The store failed; a fresh window stands in but must not be written.
    Unreadable,
}

/// Result of a permission check.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotaCheck {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
}

/// Read-only usage projection.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    pub used: u32,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
}

/// Quota tracker over an injected key-value store.
#[derive(Clone)]
pub struct QuotaTracker {
    store: Arc<dyn KeyValueStore>,
    window: Duration,
}

impl QuotaTracker {
    /// Create a tracker with the default 24h window.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_window(store, Duration::hours(DEFAULT_WINDOW_HOURS))
    }

    /// Create a tracker with a custom window length.
    pub fn with_window(store: Arc<dyn KeyValueStore>, window: Duration) -> Self {
        Self { store, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn key(client_id: &str) -> String {
        format!("{}{}", KEY_PREFIX, client_id)
    }

    /// Load state, falling back to a fresh window when the stored state is
    /// missing, unparseable, expired or could not be read at all.
    fn load(&self, client_id: &str, now: DateTime<Utc>) -> (QuotaState, LoadOutcome) {
        let key = Self::key(client_id);
        let stored = match self.store.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<QuotaState>(&raw) {
                Ok(state) => Some(state),
                Err(e) => {
                    tracing::debug!(client_id, "Discarding unparseable quota state: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(client_id, "Quota state read failed: {}", e);
                return (QuotaState::fresh(now, self.window), LoadOutcome::Unreadable);
            }
        };

        match stored {
            Some(state) if !state.is_expired(now) => (state, LoadOutcome::Current),
            _ => (QuotaState::fresh(now, self.window), LoadOutcome::Replaced),
        }
    }

    fn save(&self, client_id: &str, state: &QuotaState) {
        let key = Self::key(client_id);
        let raw = match serde_json::to_string(state) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(client_id, "Failed to serialize quota state: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(&key, &raw) {
            tracing::warn!(client_id, "Failed to persist quota state: {}", e);
        }
    }

    /// Check whether `client_id` may make another call under `limit`.
    pub fn check_quota(&self, client_id: &str, limit: u32) -> QuotaCheck {
        self.check_quota_at(client_id, limit, Utc::now())
    }

    /// [`check_quota`](Self::check_quota) at an explicit instant. Persists a
    /// reset when the window has expired.
    pub fn check_quota_at(&self, client_id: &str, limit: u32, now: DateTime<Utc>) -> QuotaCheck {
        let (state, outcome) = self.load(client_id, now);
        if outcome == LoadOutcome::Replaced {
            self.save(client_id, &state);
        }

        QuotaCheck {
            allowed: state.count < limit,
            remaining: limit.saturating_sub(state.count),
            reset_time: state.reset_time,
        }
    }

    /// Count one successful upstream call against `client_id`.
    pub fn increment_quota(&self, client_id: &str) {
        self.increment_quota_at(client_id, Utc::now());
    }

    pub fn increment_quota_at(&self, client_id: &str, now: DateTime<Utc>) {
        let (mut state, outcome) = self.load(client_id, now);
        // Writing after a failed read would clobber the real counter.
        if outcome == LoadOutcome::Unreadable {
            return;
        }
        state.count = state.count.saturating_add(1);
        self.save(client_id, &state);
    }

    /// Current usage without writing anything back.
    pub fn get_status(&self, client_id: &str, limit: u32) -> QuotaStatus {
        self.get_status_at(client_id, limit, Utc::now())
    }

    pub fn get_status_at(&self, client_id: &str, limit: u32, now: DateTime<Utc>) -> QuotaStatus {
        let (state, _) = self.load(client_id, now);

        QuotaStatus {
            used: state.count,
            remaining: limit.saturating_sub(state.count),
            reset_time: state.reset_time,
        }
    }
}
