//! Liveness monitor configuration.

use serde::{Deserialize, Serialize};

/// Liveness monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessConfig {
    /// Interval between periodic expiry checks in seconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,
    /// Remaining-lifetime threshold in seconds below which a proactive
    /// refresh is fired on the next tick.
    #[serde(default = "default_warn_window")]
    pub warn_window_seconds: u64,
    /// Seconds since the last check after which a hidden→visible
    /// transition forces a refresh.
    #[serde(default = "default_stale_window")]
    pub stale_window_seconds: u64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval(),
            warn_window_seconds: default_warn_window(),
            stale_window_seconds: default_stale_window(),
        }
    }
}

fn default_tick_interval() -> u64 {
    30
}

fn default_warn_window() -> u64 {
    120
}

fn default_stale_window() -> u64 {
    60
}
