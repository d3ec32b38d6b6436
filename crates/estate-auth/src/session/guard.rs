//! Session guard: owns the current credential and every way it can change.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use estate_core::config::SessionConfig;
use estate_core::error::AppError;
use estate_core::traits::{Collaborators, SessionApi};
use estate_core::types::{AuditEntry, Severity};
use estate_storage::{CredentialStore, UserSnapshot};

use crate::jwt::{AdminLevel, Credential, SessionClaims};

use super::access::{AccessPolicy, EndReason, verify_token};
use super::remaining::TimeRemaining;
use super::state::SessionState;

/// Scope carried by tenant-admin tokens.
const TENANT_ADMIN_SCOPE: &str = "tenant_admin";

/// Display snapshot for a status badge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    /// Email of the signed-in user.
    pub email: String,
    /// Display name, if the token carries one.
    pub full_name: Option<String>,
    /// Formatted remaining time, or `"Session expired"`.
    pub expires_in: String,
    /// Expiration instant.
    pub expires_at: DateTime<Utc>,
}

/// Tracks the bearer credential of one console context.
///
/// The token itself lives in the shared [`CredentialStore`]; the guard keeps
/// the decoded [`Credential`] that matches it. Every write of a token and
/// its credential happens under one commit lock, so readers never observe a
/// token paired with someone else's claims.
pub struct SessionGuard {
    /// Session configuration.
    config: SessionConfig,
    /// Claims required to enter the console.
    policy: AccessPolicy,
    /// Shared persisted session keys.
    store: CredentialStore,
    /// Renewal, logout and audit endpoints.
    api: Arc<dyn SessionApi>,
    /// Host-supplied notifier, navigator, reporter and clock.
    collaborators: Collaborators,
    /// Credential decoded from the stored token.
    current: RwLock<Option<Credential>>,
    /// Serializes token writes with credential installs.
    commit: Mutex<()>,
    /// Whether the expiry warning was already shown for this token.
    warned: AtomicBool,
    /// Bumped by every teardown. Renewals started under an older epoch are
    /// discarded.
    epoch: AtomicU64,
    /// Cancels the running auto-refresh loop.
    pub(super) refresh_task: Mutex<Option<CancellationToken>>,
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("config", &self.config)
            .field("current", &self.current_credential())
            .finish()
    }
}

impl SessionGuard {
    /// Creates a guard. Nothing is checked until [`SessionGuard::check_access`].
    pub fn new(
        config: SessionConfig,
        store: CredentialStore,
        api: Arc<dyn SessionApi>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            policy: AccessPolicy::from_config(&config),
            config,
            store,
            api,
            collaborators,
            current: RwLock::new(None),
            commit: Mutex::new(()),
            warned: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            refresh_task: Mutex::new(None),
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The shared credential store.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub(super) fn now(&self) -> DateTime<Utc> {
        self.collaborators.clock.now()
    }

    /// Verifies the stored token.
    ///
    /// On success the credential is installed and the user snapshot is
    /// written. On failure the session is torn down and the user redirected
    /// with the reason.
    pub fn check_access(&self) -> bool {
        let _commit = lock(&self.commit);
        self.check_access_locked()
    }

    fn check_access_locked(&self) -> bool {
        let now = self.now();
        match verify_token(self.store.token().as_deref(), &self.policy, now) {
            Ok(credential) => {
                self.install(credential, now);
                true
            }
            Err(reason) => {
                self.teardown(reason);
                false
            }
        }
    }

    fn install(&self, credential: Credential, now: DateTime<Utc>) {
        let claims = credential.claims();
        let snapshot = UserSnapshot {
            id: claims.user_id.clone(),
            email: claims.email.clone(),
            full_name: claims.full_name.clone(),
            admin_level: claims.admin_level.map(|l| l.as_str().to_string()),
            company_id: claims.company_id.clone(),
        };
        if let Err(e) = self.store.set_user(&snapshot) {
            self.collaborators.reporter.report(&e, "session.user_snapshot");
        }

        info!(
            user_id = %claims.user_id,
            email = %claims.email,
            expires_at = %claims.expires_at,
            "Session verified"
        );

        let remaining = TimeRemaining::until(credential.expires_at(), now);
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(credential);

        if let Some(remaining) = remaining {
            self.warn_if_expiring(&remaining);
        }
    }

    /// Shows the expiry warning once per token when inside the warning window.
    ///
    /// Returns `true` if the warning was shown by this call.
    pub(super) fn warn_if_expiring(&self, remaining: &TimeRemaining) -> bool {
        if !remaining.is_below(self.config.warning_threshold_seconds) {
            return false;
        }
        if self.warned.swap(true, Ordering::SeqCst) {
            return false;
        }
        warn!(seconds = remaining.seconds, "Session expiring soon");
        self.collaborators.notifier.notify(
            &format!("Your session will expire in {}", remaining.formatted),
            Severity::Warning,
        );
        true
    }

    /// Ends the session: stops auto refresh, clears the stored keys, drops
    /// the credential and redirects with `reason`.
    pub fn end_session(&self, reason: EndReason) {
        let _commit = lock(&self.commit);
        self.teardown(reason);
    }

    fn teardown(&self, reason: EndReason) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.stop_auto_refresh();
        self.store.clear();
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
        self.warned.store(false, Ordering::SeqCst);

        let destination = reason.destination(&self.config);
        match reason {
            EndReason::LoggedOut => info!(destination, "Session ended by logout"),
            _ => warn!(reason = %reason, destination, "Session ended"),
        }
        self.collaborators
            .navigator
            .redirect(destination, &reason.to_string());
    }

    /// Exchanges the current token for a fresh one.
    ///
    /// The new token is stored and verified again before it is accepted; a
    /// verification failure ends the session with that failure's reason.
    /// A transport or server failure ends the session as
    /// [`EndReason::RenewalFailed`]. A renewal that completes after the
    /// session already ended is discarded.
    pub async fn refresh_token(&self) -> bool {
        let Some(token) = self.store.token() else {
            warn!("No token to renew");
            self.end_session(EndReason::RenewalFailed);
            return false;
        };

        let epoch = self.epoch.load(Ordering::SeqCst);
        debug!(epoch, "Renewing session token");
        match self.api.refresh(&token).await {
            Ok(renewed) => self.commit_renewed(&renewed, epoch),
            Err(e) => {
                self.collaborators.reporter.report(&e, "session.refresh");
                let _commit = lock(&self.commit);
                if self.epoch.load(Ordering::SeqCst) == epoch {
                    self.teardown(EndReason::RenewalFailed);
                } else {
                    debug!("Session already ended; renewal failure ignored");
                }
                false
            }
        }
    }

    fn commit_renewed(&self, renewed: &str, epoch: u64) -> bool {
        let _commit = lock(&self.commit);

        if self.epoch.load(Ordering::SeqCst) != epoch {
            info!("Session ended during renewal; renewed token discarded");
            return false;
        }

        if let Err(e) = self.store.set_token(renewed) {
            self.collaborators.reporter.report(&e, "session.refresh");
            self.teardown(EndReason::RenewalFailed);
            return false;
        }

        self.warned.store(false, Ordering::SeqCst);
        if !self.check_access_locked() {
            warn!("Renewed token failed verification");
            return false;
        }

        info!("Session token renewed");
        true
    }

    /// Logs the user out.
    ///
    /// The token is captured before storage is cleared so the server-side
    /// revocation carries it. The revocation runs in the background and never
    /// delays the redirect; the returned handle is only useful to tests.
    pub fn logout(&self) -> Option<JoinHandle<()>> {
        self.sign_out(EndReason::LoggedOut)
    }

    /// Revokes the stored token server-side and ends the session with
    /// `reason`.
    pub(super) fn sign_out(&self, reason: EndReason) -> Option<JoinHandle<()>> {
        let token = self.store.token();
        info!(
            email = ?self.current_claims().map(|c| c.email),
            reason = %reason,
            "Signing out"
        );

        let revoke = token.and_then(|token| {
            let api = Arc::clone(&self.api);
            spawn_beacon("logout", async move { api.logout(&token).await })
        });

        self.end_session(reason);
        revoke
    }

    /// Verifies again when the stored token no longer matches the held
    /// credential, e.g. after another component stored a fresh token.
    ///
    /// Returns `false` if that verification ended the session.
    pub(super) fn resync_with_store(&self) -> bool {
        let _commit = lock(&self.commit);
        let stored = self.store.token();
        let held = self
            .current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|c| c.token().to_string());
        if stored == held {
            return true;
        }

        info!("Stored token changed; verifying again");
        self.warned.store(false, Ordering::SeqCst);
        self.check_access_locked()
    }

    /// Reports an administrator action to the audit trail.
    ///
    /// Fire and forget: failures are logged and never surface to the caller.
    pub fn log_action(
        &self,
        action: &str,
        resource: &str,
        details: HashMap<String, serde_json::Value>,
    ) -> Option<JoinHandle<()>> {
        if !self.state().is_active() {
            debug!(action, "No active session; audit entry dropped");
            return None;
        }
        let token = self.current_credential()?.token().to_string();

        let entry = AuditEntry {
            action: action.to_string(),
            resource: resource.to_string(),
            details,
            timestamp: self.now(),
        };
        let api = Arc::clone(&self.api);
        spawn_beacon("audit", async move { api.audit(&token, &entry).await })
    }

    /// The credential matching the stored token, if a session is active.
    /// `None` once the stored token was replaced or removed elsewhere.
    pub fn current_credential(&self) -> Option<Credential> {
        let held = self
            .current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()?;
        let stored = self.store.token()?;
        (held.token() == stored).then_some(held)
    }

    /// Decoded claims of the current credential.
    pub fn current_claims(&self) -> Option<SessionClaims> {
        self.current_credential().map(|c| c.claims().clone())
    }

    /// Time left on the current credential. `None` when there is no session
    /// or it has already expired.
    pub fn time_remaining(&self) -> Option<TimeRemaining> {
        let expires_at = self.current_credential()?.expires_at();
        TimeRemaining::until(expires_at, self.now())
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        SessionState::derive(
            self.current_credential().as_ref(),
            self.now(),
            self.config.warning_threshold_seconds,
        )
    }

    /// System administrator with tenant-admin scope.
    pub fn is_tenant_admin(&self) -> bool {
        self.current_claims().is_some_and(|c| {
            c.is_system_admin
                && c.admin_level == Some(AdminLevel::System)
                && c.scope == TENANT_ADMIN_SCOPE
        })
    }

    /// Company-level administrator.
    pub fn is_company_admin(&self) -> bool {
        self.current_claims()
            .is_some_and(|c| c.admin_level == Some(AdminLevel::Company))
    }

    /// Any administrative level.
    pub fn is_any_admin(&self) -> bool {
        self.current_claims()
            .and_then(|c| c.admin_level)
            .is_some_and(|level| level.is_admin())
    }

    /// Snapshot for a status badge.
    pub fn user_summary(&self) -> Option<UserSummary> {
        let credential = self.current_credential()?;
        let claims = credential.claims();
        let expires_in = TimeRemaining::until(claims.expires_at, self.now())
            .map(|r| r.formatted)
            .unwrap_or_else(|| "Session expired".to_string());

        Some(UserSummary {
            email: claims.email.clone(),
            full_name: claims.full_name.clone(),
            expires_in,
            expires_at: claims.expires_at,
        })
    }
}

fn lock(mutex: &Mutex<()>) -> MutexGuard<'_, ()> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Runs a best-effort request in the background.
fn spawn_beacon<F>(name: &'static str, request: F) -> Option<JoinHandle<()>>
where
    F: std::future::Future<Output = Result<(), AppError>> + Send + 'static,
{
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!(beacon = name, "No async runtime; beacon skipped");
        return None;
    };
    Some(runtime.spawn(async move {
        match request.await {
            Ok(()) => debug!(beacon = name, "Beacon delivered"),
            Err(e) => warn!(beacon = name, error = %e, "Beacon failed"),
        }
    }))
}
