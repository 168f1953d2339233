//! HTTP API for the writing-assist gateway.
//!
//! Endpoints:
//! - GET /health - Health check
//! - POST /api/suggest - Forward a prompt upstream (quota untouched)
//! - POST /api/assist/:client_id - Quota check, forward, count on success
//! - GET /api/quota/:client_id - Quota status (read-only)
//! - POST /api/quota/:client_id/check - Quota check (persists resets)
//! - POST /api/quota/:client_id/increment - Count one call
//! - GET /api/settings - Upstream and quota settings

mod handlers;
#[cfg(test)]
mod tests;
mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, LogVerbosity, StoreKind};
use crate::gateway::GeminiClient;
use crate::quota::{QuotaTracker, DEFAULT_LIMIT};
use crate::storage::{KeyValueStore, MemoryStore, SqliteStore};

pub use types::*;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: GeminiClient,
    pub quota: QuotaTracker,
    pub daily_limit: u32,
    pub verbosity: LogVerbosity,
}

impl AppState {
    pub fn new(gateway: GeminiClient, quota: QuotaTracker) -> Self {
        Self {
            gateway,
            quota,
            daily_limit: DEFAULT_LIMIT,
            verbosity: LogVerbosity::default(),
        }
    }

    pub fn with_daily_limit(mut self, limit: u32) -> Self {
        self.daily_limit = limit;
        self
    }

    pub fn with_verbosity(mut self, verbosity: LogVerbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Build state from configuration, opening the configured quota store.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = open_store(config)?;
        let quota = QuotaTracker::with_window(store, config.quota_window());
        let gateway = GeminiClient::from_config(config)?;

        Ok(Self::new(gateway, quota)
            .with_daily_limit(config.quota.daily_limit)
            .with_verbosity(config.app.log_verbosity.clone()))
    }
}

/// Open the quota store selected in `config`.
pub fn open_store(config: &Config) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.quota.store {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::Sqlite => Arc::new(SqliteStore::open(&config.quota.db_path)?),
    };
    Ok(store)
}

/// Create the API router with the given state.
pub fn create_router_with_state(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/suggest", post(handlers::suggest))
        .route("/api/assist/{client_id}", post(handlers::assist))
        .route("/api/quota/{client_id}", get(handlers::get_quota))
        .route("/api/quota/{client_id}/check", post(handlers::check_quota))
        .route(
            "/api/quota/{client_id}/increment",
            post(handlers::increment_quota),
        )
        .route("/api/settings", get(handlers::get_settings))
        .with_state(Arc::new(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}
