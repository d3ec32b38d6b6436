//! Realtime channel configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Realtime (WebSocket) channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Push endpoint URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// First reconnect delay in milliseconds.
    #[serde(default = "default_base_delay")]
    pub base_reconnect_delay_ms: u64,
    /// Ceiling for the reconnect delay in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_reconnect_delay_ms: u64,
    /// Automatic reconnect attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_reconnect_attempts: u32,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            base_reconnect_delay_ms: default_base_delay(),
            max_reconnect_delay_ms: default_max_delay(),
            max_reconnect_attempts: default_max_attempts(),
        }
    }
}

impl RealtimeConfig {
    /// Rejects a backoff whose base exceeds its ceiling.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.base_reconnect_delay_ms > self.max_reconnect_delay_ms {
            return Err(AppError::configuration(format!(
                "realtime.base_reconnect_delay_ms ({}) exceeds max_reconnect_delay_ms ({})",
                self.base_reconnect_delay_ms, self.max_reconnect_delay_ms
            )));
        }
        Ok(())
    }
}

fn default_url() -> String {
    "ws://localhost:8000/ws/notifications/".to_string()
}

fn default_base_delay() -> u64 {
    3000
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    5
}
