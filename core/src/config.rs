//! Client configuration.
//!
//! # Design
//! `ClientConfig` is built once and never mutated afterwards; `Client` takes
//! it by value. The API key is a secret, so the `Debug` impl redacts it and
//! nothing in the crate logs it.

use std::fmt;
use std::time::Duration;

/// Production endpoint of the remote API.
pub const DEFAULT_BASE_URL: &str = "https://auto-api.com";

/// API version used for the per-source GET endpoints.
pub const DEFAULT_API_VERSION: &str = "v2";

/// Upper bound on a single request round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a `Client`.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    api_key: String,
    base_url: String,
    api_version: String,
    timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the client at a different host. Trailing slashes are stripped.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}
