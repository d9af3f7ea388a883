//! Client session configuration.

use serde::Deserialize;

/// Settings for a [`Client`](crate::Client) session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Prefix joined verbatim with every request path.
    pub base_url: String,
    /// Per-request timeout in whole seconds; 0 waits forever.
    #[serde(default)]
    pub timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: 0,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
