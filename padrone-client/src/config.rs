//! Client configuration.

use padrone_core::{ClientError, ClientResult};
use std::time::Duration;

/// Headers every request may carry: Content-Type, Accept and the auth header.
const MIN_HEADER_CAPACITY: usize = 3;

/// Configuration for a [`crate::PadroneClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Master server base URL, e.g. `http://padrone.example.com`.
    pub master_server_url: String,
    /// Game version sent with host listings.
    pub app_version: String,
    /// Transports per HTTP method.
    pub pool_capacity: usize,
    /// Maximum header pairs per request.
    pub header_capacity: usize,
    /// Time a request may take before it is aborted.
    pub request_timeout: Duration,
    /// How often a pending request checks for completion.
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            master_server_url: "http://localhost:15492".to_string(),
            app_version: "0.0.0".to_string(),
            pool_capacity: 16,
            header_capacity: 8,
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(16),
        }
    }
}

impl ClientConfig {
    /// Create a config for the given server and game version.
    pub fn new(master_server_url: &str, app_version: &str) -> Self {
        Self {
            master_server_url: master_server_url.to_string(),
            app_version: app_version.to_string(),
            ..Default::default()
        }
    }

    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    pub fn with_header_capacity(mut self, capacity: usize) -> Self {
        self.header_capacity = capacity;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Base URL of the application endpoints (`.../app`).
    pub fn app_url(&self) -> String {
        format!("{}/app", self.master_server_url.trim_end_matches('/'))
    }

    /// Check the config for values the engine cannot work with.
    pub fn validate(&self) -> ClientResult<()> {
        if !self.master_server_url.starts_with("http://") {
            return Err(ClientError::config(format!(
                "master server url must be plain http: {}",
                self.master_server_url
            )));
        }
        if self.pool_capacity == 0 {
            return Err(ClientError::config("pool capacity must be at least 1"));
        }
        if self.header_capacity < MIN_HEADER_CAPACITY {
            return Err(ClientError::config(format!(
                "header capacity must be at least {}",
                MIN_HEADER_CAPACITY
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::config("request timeout must be positive"));
        }
        if self.poll_interval.is_zero() {
            return Err(ClientError::config("poll interval must be positive"));
        }
        Ok(())
    }
}
