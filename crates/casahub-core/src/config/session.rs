//! Session store configuration.

use serde::{Deserialize, Serialize};

/// Session store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Timeout in seconds for a single provider token-refresh call.
    /// Refresh calls are collapsed, not cancelled, so this is the only
    /// place a hung provider call is bounded.
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_timeout_seconds: default_refresh_timeout(),
        }
    }
}

fn default_refresh_timeout() -> u64 {
    10
}
