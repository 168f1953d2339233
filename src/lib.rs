//! quillgate - Quota-limited writing-assist gateway for the blog editor.
//!
//! Features:
//! - Single-turn prompt forwarding to a generative-text API
//! - Per-client request quota over a rolling 24h window
//! - Pluggable key-value storage (in-memory or SQLite)
//! - Uniform JSON errors

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod logger;
pub mod quota;
pub mod storage;
