//! Configuration types for backend clients.

use std::time::Duration;

/// Default OpenSearch URL.
pub const DEFAULT_URL: &str = "http://localhost:9200";

/// Connection settings for a search backend client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The backend server URL (e.g., "http://localhost:9200").
    pub url: String,
    /// Per-request timeout. `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
    /// Bypass any system proxy configuration.
    pub disable_proxy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout: None,
            disable_proxy: true,
        }
    }
}

impl ClientConfig {
    /// Create a config for the given URL with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
