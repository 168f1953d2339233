//! Shared HTTP client factory.

use reqwest::Client;
use std::time::Duration;

/// Default timeout for upstream calls (30 seconds), used when the config
/// does not set `upstream.timeout_secs`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create a new HTTP client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("quillgate/", env!("CARGO_PKG_VERSION")))
        .build()
}
