//! Bundle of the UI-side collaborators both console components need.

use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::navigator::Navigator;
use super::notifier::Notifier;
use super::reporter::{ErrorReporter, TracingErrorReporter};

/// Handles to the host application's notification sink, redirect
/// primitive, error reporter, and clock.
#[derive(Debug, Clone)]
pub struct Collaborators {
    /// Toast-level notices.
    pub notifier: Arc<dyn Notifier>,
    /// Page navigation.
    pub navigator: Arc<dyn Navigator>,
    /// Sink for isolated failures.
    pub reporter: Arc<dyn ErrorReporter>,
    /// Wall clock.
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Bundles a notifier and navigator with the tracing reporter and the
    /// system clock.
    pub fn new(notifier: Arc<dyn Notifier>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            notifier,
            navigator,
            reporter: Arc::new(TracingErrorReporter),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the error reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }
}
