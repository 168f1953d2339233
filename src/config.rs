//! Configuration management for quillgate.
//!
//! Loads settings from `~/.config/quillgate/config.toml` with environment overrides.

use crate::http::DEFAULT_TIMEOUT;
use crate::quota::{DEFAULT_LIMIT, DEFAULT_WINDOW_HOURS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_UPSTREAM_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Longest accepted quota window (one leap year).
pub const MAX_WINDOW_HOURS: i64 = 24 * 366;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub api_keys: ApiKeysConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ApiKeysConfig {
    #[serde(default)]
    pub gemini: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotaConfig {
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
    #[serde(default)]
    pub store: StoreKind,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_verbosity")]
    pub log_verbosity: LogVerbosity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogVerbosity {
    Minimal,
    #[default]
    Compact,
    Verbose,
}

// Default value functions
fn default_port() -> u16 { 3030 }
fn default_upstream_url() -> String { DEFAULT_UPSTREAM_URL.to_string() }
fn default_model() -> String { DEFAULT_MODEL.to_string() }
fn default_timeout_secs() -> u64 { DEFAULT_TIMEOUT.as_secs() }
fn default_daily_limit() -> u32 { DEFAULT_LIMIT }
fn default_window_hours() -> i64 { DEFAULT_WINDOW_HOURS }
fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quillgate")
        .join("quota.db")
}
fn default_verbosity() -> LogVerbosity { LogVerbosity::Compact }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
            window_hours: default_window_hours(),
            store: StoreKind::default(),
            db_path: default_db_path(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_verbosity: default_verbosity(),
        }
    }
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quillgate")
            .join("config.toml")
    }

    /// Load config from file, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path())
    }

    /// Load config from a specific path.
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Apply environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.is_empty() {
                self.api_keys.gemini = Some(key);
            }
        }
        if let Ok(url) = std::env::var("QUILLGATE_UPSTREAM_URL") {
            self.upstream.base_url = url;
        }
        if let Ok(model) = std::env::var("QUILLGATE_MODEL") {
            self.upstream.model = model;
        }
        if let Ok(val) = std::env::var("QUILLGATE_PORT") {
            if let Ok(port) = val.parse() {
                self.gateway.port = port;
            }
        }
        if let Ok(val) = std::env::var("QUILLGATE_DAILY_LIMIT") {
            if let Ok(limit) = val.parse() {
                self.quota.daily_limit = limit;
            }
        }
        self
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(&path, content).map_err(ConfigError::Io)
    }

    /// Configured window length, clamped to `1..=MAX_WINDOW_HOURS` hours.
    pub fn quota_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.quota.window_hours.clamp(1, MAX_WINDOW_HOURS))
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Serialize(e) => write!(f, "Serialize error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
