//! Error-handling collaborator.

use tracing::{error, warn};

use crate::error::{AppError, Disposition};

/// Receives failures that must not propagate to the caller that triggered
/// them (listener failures, undecodable frames, dropped beacons).
pub trait ErrorReporter: Send + Sync + std::fmt::Debug + 'static {
    /// Records `error` raised while handling `context`.
    fn report(&self, error: &AppError, context: &str);
}

/// Reporter that only writes to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, err: &AppError, context: &str) {
        match err.disposition() {
            Disposition::LogOnly => {
                warn!(kind = %err.kind, context, error = %err.message, "Console error")
            }
            Disposition::Notice | Disposition::Redirect => {
                error!(kind = %err.kind, context, error = %err.message, "Console error")
            }
        }
    }
}
