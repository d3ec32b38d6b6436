//! Toast-level notification sink supplied by the surrounding UI layer.

use crate::types::Severity;

/// Shows user-visible notices.
pub trait Notifier: Send + Sync + std::fmt::Debug + 'static {
    /// Displays `message` at the given severity.
    fn notify(&self, message: &str, severity: Severity);
}
