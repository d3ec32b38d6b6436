//! Time left before a credential expires.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Remaining lifetime of a session.
///
/// `seconds`, `minutes` and `hours` are each a total floor of `ms`, not the
/// components of a clock reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeRemaining {
    /// Milliseconds left.
    pub ms: i64,
    /// Whole seconds left.
    pub seconds: i64,
    /// Whole minutes left.
    pub minutes: i64,
    /// Whole hours left.
    pub hours: i64,
    /// Human readable form: `"1h 5m"`, `"4m 30s"` or `"12s"`.
    pub formatted: String,
}

impl TimeRemaining {
    /// Time left until `expires_at`, or `None` when it has already passed.
    pub fn until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<Self> {
        let ms = (expires_at - now).num_milliseconds();
        if ms <= 0 {
            return None;
        }
        Some(Self::from_millis(ms))
    }

    fn from_millis(ms: i64) -> Self {
        let seconds = ms / 1000;
        let minutes = ms / 60_000;
        let hours = ms / 3_600_000;

        let formatted = if hours > 0 {
            format!("{hours}h {}m", minutes % 60)
        } else if minutes > 0 {
            format!("{minutes}m {}s", seconds % 60)
        } else {
            format!("{seconds}s")
        };

        Self {
            ms,
            seconds,
            minutes,
            hours,
            formatted,
        }
    }

    /// Whether fewer than `threshold_seconds` remain.
    pub fn is_below(&self, threshold_seconds: u64) -> bool {
        self.ms < (threshold_seconds as i64).saturating_mul(1000)
    }
}
