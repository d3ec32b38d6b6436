//! Reconnect backoff policy.
//!
//! `delay(n) = min(base * 2^(n-1), max)` for the n-th consecutive failure.
//! Deterministic, without jitter.

use std::time::Duration;

use estate_core::config::RealtimeConfig;

/// When and how often a dropped connection is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay after the first failure.
    pub base: Duration,
    /// Ceiling for any delay.
    pub max_delay: Duration,
    /// Automatic attempts before giving up.
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    /// Builds the policy from realtime configuration.
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            base: Duration::from_millis(config.base_reconnect_delay_ms),
            max_delay: Duration::from_millis(config.max_reconnect_delay_ms),
            max_attempts: config.max_reconnect_attempts,
        }
    }

    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(shift).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max_delay)
    }

    /// Whether another automatic attempt is allowed after `failures`
    /// consecutive failures.
    pub fn allows_retry(&self, failures: u32) -> bool {
        failures < self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&RealtimeConfig::default())
    }
}
