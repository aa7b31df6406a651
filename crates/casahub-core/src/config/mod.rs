//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod liveness;
pub mod logging;
pub mod session;

use serde::{Deserialize, Serialize};

use self::liveness::LivenessConfig;
use self::logging::LoggingConfig;
use self::session::SessionConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Session store settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Liveness monitor settings.
    #[serde(default)]
    pub liveness: LivenessConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `CASAHUB_`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CASAHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.liveness.tick_interval_seconds, 30);
        assert_eq!(config.liveness.warn_window_seconds, 120);
        assert_eq!(config.liveness.stale_window_seconds, 60);
        assert_eq!(config.session.refresh_timeout_seconds, 10);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AppConfig =
            serde_json::from_str(r#"{"liveness": {"warn_window_seconds": 300}}"#)
                .expect("deserialize");
        assert_eq!(config.liveness.warn_window_seconds, 300);
        // Unset fields fall back to defaults.
        assert_eq!(config.liveness.tick_interval_seconds, 30);
        assert_eq!(config.session.refresh_timeout_seconds, 10);
    }
}
