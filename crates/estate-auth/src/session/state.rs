//! Session state derived from the held credential and the clock.

use chrono::{DateTime, Utc};

use crate::jwt::Credential;

use super::remaining::TimeRemaining;

/// Where a session stands right now. Never stored; recomputed on demand.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No credential is held.
    Unauthenticated,
    /// A credential is held and outside the warning window.
    Authenticated(Credential),
    /// A credential is held and inside the warning window.
    Expiring {
        /// The held credential.
        credential: Credential,
        /// Time left before it expires.
        remaining: TimeRemaining,
    },
    /// The held credential has expired.
    Expired,
}

impl SessionState {
    /// Derives the state of `credential` at `now`.
    pub fn derive(
        credential: Option<&Credential>,
        now: DateTime<Utc>,
        warning_threshold_seconds: u64,
    ) -> Self {
        let Some(credential) = credential else {
            return Self::Unauthenticated;
        };
        match TimeRemaining::until(credential.expires_at(), now) {
            None => Self::Expired,
            Some(remaining) if remaining.is_below(warning_threshold_seconds) => Self::Expiring {
                credential: credential.clone(),
                remaining,
            },
            Some(_) => Self::Authenticated(credential.clone()),
        }
    }

    /// Whether a usable credential is held.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Authenticated(_) | Self::Expiring { .. })
    }
}
