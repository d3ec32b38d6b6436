//! Periodic session check: renews before expiry, warns once, ends the
//! session when no time is left.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::access::EndReason;
use super::guard::SessionGuard;

/// What one auto-refresh tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session ended during this tick.
    Ended,
    /// The session is still active.
    Active {
        /// The token was renewed during this tick.
        renewed: bool,
        /// The session is inside the warning window after this tick.
        expiring: bool,
    },
}

impl SessionGuard {
    /// Verifies access and, on success, starts auto refresh.
    pub fn init(self: &Arc<Self>) -> bool {
        info!("Initializing session guard");
        if !self.check_access() {
            return false;
        }
        self.start_auto_refresh();
        true
    }

    /// Starts the periodic check. Idempotent: returns `false` if a loop is
    /// already running or there is no runtime to run it on.
    ///
    /// The loop only holds a weak reference, so dropping the last guard
    /// also ends it.
    pub fn start_auto_refresh(self: &Arc<Self>) -> bool {
        let mut slot = self.refresh_task.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|t| !t.is_cancelled()) {
            debug!("Auto refresh already running");
            return false;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime; auto refresh not started");
            return false;
        };

        let cancel = CancellationToken::new();
        *slot = Some(cancel.clone());
        drop(slot);

        let interval_seconds = self.config().check_interval_seconds;
        runtime.spawn(run_refresh_loop(
            Arc::downgrade(self),
            Duration::from_secs(interval_seconds),
            cancel,
        ));

        info!(interval_seconds, "Auto refresh started");
        true
    }

    /// Stops the periodic check, if running. An in-flight renewal is not
    /// interrupted.
    pub fn stop_auto_refresh(&self) {
        let task = self
            .refresh_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(cancel) = task {
            cancel.cancel();
            debug!("Auto refresh stopped");
        }
    }

    /// Whether the periodic check is running.
    pub fn is_auto_refreshing(&self) -> bool {
        self.refresh_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }

    /// Runs one check.
    ///
    /// 1. A token stored elsewhere since the last check is verified again
    /// 2. No time left signs out as [`EndReason::Expired`], revoking the
    ///    token server-side
    /// 3. Below the refresh threshold the token is renewed
    /// 4. Below the warning threshold the user is warned, once per token
    pub async fn tick(&self) -> TickOutcome {
        if !self.resync_with_store() {
            return TickOutcome::Ended;
        }

        let Some(mut remaining) = self.time_remaining() else {
            info!("Session has no time left");
            self.sign_out(EndReason::Expired);
            return TickOutcome::Ended;
        };

        let mut renewed = false;
        if remaining.is_below(self.config().refresh_threshold_seconds) {
            debug!(seconds = remaining.seconds, "Token expiring soon, renewing");
            if !self.refresh_token().await {
                return TickOutcome::Ended;
            }
            renewed = true;
            remaining = match self.time_remaining() {
                Some(r) => r,
                None => {
                    self.sign_out(EndReason::Expired);
                    return TickOutcome::Ended;
                }
            };
        }

        self.warn_if_expiring(&remaining);
        TickOutcome::Active {
            renewed,
            expiring: remaining.is_below(self.config().warning_threshold_seconds),
        }
    }
}

async fn run_refresh_loop(guard: Weak<SessionGuard>, period: Duration, cancel: CancellationToken) {
    let mut interval = time::interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let Some(guard) = guard.upgrade() else {
            break;
        };
        if guard.tick().await == TickOutcome::Ended {
            break;
        }
    }

    debug!("Auto refresh loop ended");
}
