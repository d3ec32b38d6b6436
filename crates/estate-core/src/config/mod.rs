//! Console configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every section falls back to its defaults when absent.

pub mod endpoints;
pub mod logging;
pub mod realtime;
pub mod session;
pub mod storage;

use serde::{Deserialize, Serialize};

pub use self::endpoints::EndpointConfig;
pub use self::logging::LoggingConfig;
pub use self::realtime::RealtimeConfig;
pub use self::session::SessionConfig;
pub use self::storage::{StorageBackend, StorageConfig};

use crate::error::AppError;

/// Root console configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Session guard settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Realtime channel settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// HTTP endpoints consumed by the session guard.
    #[serde(default)]
    pub endpoints: EndpointConfig,
    /// Credential persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default` with an environment-specific overlay and
    /// environment variables prefixed with `ESTATE__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("ESTATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Checks cross-field constraints the individual sections cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        self.session.validate()?;
        self.realtime.validate()?;
        Ok(())
    }
}
