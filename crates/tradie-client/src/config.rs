//! Client configuration

use std::time::Duration;

use crate::ClientError;

/// Default grace window for an offline subscription snapshot
pub const DEFAULT_OFFLINE_GRACE: Duration = Duration::from_secs(72 * 60 * 60);

/// Default storage key for the subscription snapshot
pub const DEFAULT_SNAPSHOT_KEY: &str = "tradiemate.subscription_snapshot";

/// Billing API client configuration
#[derive(Clone)]
pub struct ClientConfig {
    base_url: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Create a configuration for the billing API at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "base url must be http(s): {base_url}"
            )));
        }

        Ok(Self {
            base_url,
            api_key: None,
            request_timeout: Duration::from_secs(10),
        })
    }

    /// Send `Authorization: Bearer <key>` with every request
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

/// Offline snapshot configuration
#[derive(Debug, Clone)]
pub struct OfflineCacheConfig {
    /// How old a snapshot may be and still be trusted.
    /// Default: 72 hours
    pub grace_period: Duration,
    /// Key the snapshot is stored under
    pub storage_key: String,
}

impl Default for OfflineCacheConfig {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_OFFLINE_GRACE,
            storage_key: DEFAULT_SNAPSHOT_KEY.to_string(),
        }
    }
}

impl OfflineCacheConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the grace window.
    #[must_use]
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Set the storage key.
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }
}
