//! Tracing subscriber bootstrap.

use tracing_subscriber::{EnvFilter, fmt};

use estate_core::config::LoggingConfig;

/// Installs the global subscriber. `RUST_LOG` overrides the configured
/// level. Calling it twice is harmless: the second install is ignored.
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let installed = match config.format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .try_init(),
        _ => fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
