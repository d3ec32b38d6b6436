//! Session guard integration tests.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;

use estate_auth::{SessionState, TickOutcome};

use crate::helpers::{self, Harness, admin_claims, mint, settle};

// ── Access verification ──────────────────────────────────────────

#[test]
fn test_valid_token_grants_access_and_writes_user() {
    let h = Harness::new();
    h.login(3600);
    let guard = h.guard();

    assert!(guard.check_access());
    assert_eq!(h.navigator.count(), 0);

    let user = h.store.user().expect("user snapshot written");
    assert_eq!(user.id, "42");
    assert_eq!(user.email, "admin@estate.test");
    assert_eq!(user.admin_level.as_deref(), Some("system"));
    assert_eq!(user.company_id.as_deref(), Some("7"));
    assert!(guard.is_tenant_admin());
    assert!(guard.is_any_admin());
    assert!(!guard.is_company_admin());
}

#[test]
fn test_missing_token_redirects_to_login() {
    let h = Harness::new();
    let guard = h.guard();

    assert!(!guard.check_access());
    let (destination, reason) = h.navigator.last().unwrap();
    assert_eq!(destination, h.config.session.login_path);
    assert_eq!(reason, "Authentication required");
}

#[test]
fn test_garbage_token_is_invalid() {
    let h = Harness::new();
    h.store.set_token("not-a-jwt").unwrap();
    let guard = h.guard();

    assert!(!guard.check_access());
    assert_eq!(h.navigator.last().unwrap().1, "Invalid authentication token");
    assert!(h.store.token().is_none());
}

#[test]
fn test_missing_claims_clears_storage() {
    let h = Harness::new();
    let mut claims = admin_claims(h.now(), 3600);
    claims.as_object_mut().unwrap().remove("email");
    h.store.set_token(&mint(&claims)).unwrap();
    let guard = h.guard();

    assert!(!guard.check_access());
    let (destination, reason) = h.navigator.last().unwrap();
    assert_eq!(destination, h.config.session.login_path);
    assert_eq!(reason, "Missing required claims");
    assert!(h.store.token().is_none());
    assert!(h.store.user().is_none());
    assert!(guard.current_claims().is_none());
}

#[test]
fn test_expired_token_reports_expired_regardless_of_claims() {
    let h = Harness::new();
    let token = mint(&json!({"exp": h.now().timestamp() - 10}));
    h.store.set_token(&token).unwrap();
    let guard = h.guard();

    assert!(!guard.check_access());
    let (destination, reason) = h.navigator.last().unwrap();
    assert_eq!(destination, h.config.session.login_path);
    assert_eq!(reason, "expired");
}

#[test]
fn test_invalid_admin_level_is_denied() {
    let h = Harness::new();
    let mut claims = admin_claims(h.now(), 3600);
    claims["admin_level"] = json!("company");
    h.store.set_token(&mint(&claims)).unwrap();
    let guard = h.guard();

    assert!(!guard.check_access());
    let (destination, reason) = h.navigator.last().unwrap();
    assert_eq!(destination, h.config.session.access_denied_path);
    assert_eq!(reason, "Invalid admin level");
    assert_eq!(
        h.navigator.last_url().unwrap(),
        "/tenant-admin/access-denied/?reason=Invalid%20admin%20level"
    );
    assert!(h.store.token().is_none());
    assert!(h.store.user().is_none());
}

#[test]
fn test_privilege_failures_are_denials() {
    let cases = [
        ("is_system_admin", json!(false), "Not a system administrator"),
        ("scope", json!("company_admin"), "Invalid scope for Tenant Admin"),
    ];

    for (field, value, expected) in cases {
        let h = Harness::new();
        let mut claims = admin_claims(h.now(), 3600);
        claims[field] = value;
        h.store.set_token(&mint(&claims)).unwrap();
        let guard = h.guard();

        assert!(!guard.check_access(), "{field} should be rejected");
        let (destination, reason) = h.navigator.last().unwrap();
        assert_eq!(destination, h.config.session.access_denied_path);
        assert_eq!(reason, expected);
    }
}

#[test]
fn test_configured_admin_level_is_honoured() {
    let mut h = Harness::new();
    h.config.session.required_admin_level = "company".to_string();
    let mut claims = admin_claims(h.now(), 3600);
    claims["admin_level"] = json!("company");
    h.store.set_token(&mint(&claims)).unwrap();
    let guard = h.guard();

    assert!(guard.check_access());
    assert!(guard.is_company_admin());
    assert!(guard.is_any_admin());
    assert!(!guard.is_tenant_admin());
}

// ── Renewal ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_replaces_token() {
    let h = Harness::new();
    let original = h.login(120);
    let guard = h.guard();
    assert!(guard.check_access());

    let renewed = helpers::admin_token(h.now(), 3600);
    h.api.queue_renewal(renewed.clone());

    assert!(guard.refresh_token().await);
    assert_eq!(h.api.refresh_calls.lock().unwrap().as_slice(), [original]);
    assert_eq!(h.store.token(), Some(renewed));
    assert_eq!(guard.time_remaining().unwrap().seconds, 3600);
    assert_eq!(h.navigator.count(), 0);
}

#[tokio::test]
async fn test_refresh_failure_ends_session() {
    let h = Harness::new();
    h.login(120);
    let guard = h.guard();
    assert!(guard.check_access());

    assert!(!guard.refresh_token().await);
    let (destination, reason) = h.navigator.last().unwrap();
    assert_eq!(destination, h.config.session.login_path);
    assert_eq!(reason, "session expired");
    assert!(h.store.token().is_none());
    assert!(h.reporter.contexts().contains(&"session.refresh".to_string()));
    assert_eq!(guard.state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_renewed_token_is_verified_again() {
    let h = Harness::new();
    h.login(120);
    let guard = h.guard();
    assert!(guard.check_access());

    let mut claims = admin_claims(h.now(), 3600);
    claims["scope"] = json!("viewer");
    h.api.queue_renewal(mint(&claims));

    assert!(!guard.refresh_token().await);
    let (destination, reason) = h.navigator.last().unwrap();
    assert_eq!(destination, h.config.session.access_denied_path);
    assert_eq!(reason, "Invalid scope for Tenant Admin");
    assert!(h.store.token().is_none());
}

#[tokio::test]
async fn test_renewal_finishing_after_logout_is_discarded() {
    let h = Harness::new();
    h.login(120);
    let guard = h.guard();
    assert!(guard.check_access());

    h.api.hold_refresh.store(true, Ordering::SeqCst);
    h.api.queue_renewal(helpers::admin_token(h.now(), 3600));
    let renewing = tokio::spawn({
        let guard = guard.clone();
        async move { guard.refresh_token().await }
    });
    settle().await;
    assert_eq!(h.api.refresh_count(), 1);

    guard.logout();
    h.api.release.notify_one();

    assert!(!renewing.await.unwrap());
    assert!(h.store.token().is_none());
    assert!(h.store.user().is_none());
    assert!(guard.current_claims().is_none());
    assert_eq!(h.navigator.count(), 1);
    assert_eq!(h.navigator.last().unwrap().1, "logged out");
}

#[tokio::test]
async fn test_renewal_failing_after_logout_does_not_redirect_again() {
    let h = Harness::new();
    h.login(120);
    let guard = h.guard();
    assert!(guard.check_access());

    h.api.hold_refresh.store(true, Ordering::SeqCst);
    let renewing = tokio::spawn({
        let guard = guard.clone();
        async move { guard.refresh_token().await }
    });
    settle().await;

    guard.logout();
    h.api.release.notify_one();

    assert!(!renewing.await.unwrap());
    assert_eq!(h.navigator.count(), 1);
    assert_eq!(h.navigator.last().unwrap().1, "logged out");
}

// ── Periodic check ───────────────────────────────────────────────

#[tokio::test]
async fn test_tick_warns_once() {
    let mut h = Harness::new();
    h.config.session.refresh_threshold_seconds = 60;
    h.login(250);
    let guard = h.guard();

    assert!(guard.check_access());
    assert_eq!(h.notifier.count_containing("Your session will expire in"), 1);
    assert!(
        h.notifier
            .messages()
            .contains(&"Your session will expire in 4m 10s".to_string())
    );

    h.clock.advance(60);
    let outcome = guard.tick().await;
    assert_eq!(
        outcome,
        TickOutcome::Active {
            renewed: false,
            expiring: true
        }
    );
    assert_eq!(h.notifier.count_containing("Your session will expire in"), 1);
    assert!(matches!(guard.state(), SessionState::Expiring { .. }));
}

#[tokio::test]
async fn test_tick_renews_below_threshold_and_rearms_warning() {
    let h = Harness::new();
    h.login(700);
    let guard = h.guard();
    assert!(guard.check_access());
    assert_eq!(h.notifier.count_containing("Your session will expire in"), 0);

    h.clock.advance(450);
    h.api.queue_renewal(helpers::admin_token(h.now(), 200));
    let outcome = guard.tick().await;

    assert_eq!(
        outcome,
        TickOutcome::Active {
            renewed: true,
            expiring: true
        }
    );
    assert_eq!(h.api.refresh_count(), 1);
    assert_eq!(h.notifier.count_containing("Your session will expire in"), 1);
}

#[tokio::test]
async fn test_tick_without_time_left_signs_out() {
    let h = Harness::new();
    let token = h.login(30);
    let guard = h.guard();
    assert!(guard.check_access());

    h.clock.advance(31);
    assert_eq!(guard.tick().await, TickOutcome::Ended);
    let (destination, reason) = h.navigator.last().unwrap();
    assert_eq!(destination, h.config.session.login_path);
    assert_eq!(reason, "expired");
    assert_eq!(h.api.refresh_count(), 0);
    assert!(h.store.token().is_none());

    settle().await;
    assert_eq!(h.api.logout_calls.lock().unwrap().as_slice(), [token]);
}

#[tokio::test]
async fn test_tick_adopts_token_stored_elsewhere() {
    let h = Harness::new();
    h.login(30);
    let guard = h.guard();
    assert!(guard.check_access());

    let fresh = helpers::admin_token(h.now(), 3600);
    h.store.set_token(&fresh).unwrap();
    assert!(guard.current_credential().is_none());

    h.clock.advance(31);
    assert_eq!(
        guard.tick().await,
        TickOutcome::Active {
            renewed: false,
            expiring: false
        }
    );
    assert_eq!(h.store.token(), Some(fresh));
    assert_eq!(h.navigator.count(), 0);
    assert_eq!(guard.time_remaining().unwrap().seconds, 3569);
}

#[tokio::test]
async fn test_tick_ends_session_when_token_removed_elsewhere() {
    let h = Harness::new();
    h.login(3600);
    let guard = h.guard();
    assert!(guard.check_access());

    h.store.clear();
    assert!(guard.current_claims().is_none());
    assert_eq!(guard.tick().await, TickOutcome::Ended);
    assert_eq!(h.navigator.last().unwrap().1, "Authentication required");
    assert!(h.api.logout_calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_auto_refresh_renews_on_schedule() {
    let h = Harness::new();
    h.login(700);
    let guard = h.guard();

    assert!(guard.init());
    assert!(guard.is_auto_refreshing());
    assert!(!guard.start_auto_refresh());

    // First tick: plenty of time left.
    h.clock.advance(60);
    helpers::advance(Duration::from_secs(60)).await;
    assert_eq!(h.api.refresh_count(), 0);

    // Second tick: below the refresh threshold.
    h.clock.advance(60);
    h.api.queue_renewal(helpers::admin_token(h.now(), 3600));
    helpers::advance(Duration::from_secs(60)).await;
    assert_eq!(h.api.refresh_count(), 1);
    assert_eq!(guard.time_remaining().unwrap().seconds, 3600);
    assert!(guard.is_auto_refreshing());

    guard.stop_auto_refresh();
    assert!(!guard.is_auto_refreshing());
}

#[tokio::test(start_paused = true)]
async fn test_auto_refresh_stops_when_renewal_fails() {
    let h = Harness::new();
    h.login(500);
    let guard = h.guard();
    assert!(guard.init());

    h.clock.advance(60);
    helpers::advance(Duration::from_secs(60)).await;

    assert_eq!(h.api.refresh_count(), 1);
    assert_eq!(h.navigator.last().unwrap().1, "session expired");
    assert!(!guard.is_auto_refreshing());

    h.clock.advance(60);
    helpers::advance(Duration::from_secs(60)).await;
    assert_eq!(h.api.refresh_count(), 1);
}

#[test]
fn test_init_denied_does_not_start_refresh() {
    let h = Harness::new();
    let guard = h.guard();
    assert!(!guard.init());
    assert!(!guard.is_auto_refreshing());
}

// ── Logout and audit ─────────────────────────────────────────────

#[tokio::test]
async fn test_logout_beacon_carries_token() {
    let h = Harness::new();
    let token = h.login(3600);
    let guard = h.guard();
    assert!(guard.check_access());

    let beacon = guard.logout().expect("beacon spawned");
    let (destination, reason) = h.navigator.last().unwrap();
    assert_eq!(destination, h.config.session.login_path);
    assert_eq!(reason, "logged out");
    assert!(h.store.token().is_none());

    beacon.await.unwrap();
    assert_eq!(h.api.logout_calls.lock().unwrap().as_slice(), [token]);
}

#[tokio::test]
async fn test_logout_redirects_even_if_beacon_fails() {
    let h = Harness::new();
    h.login(3600);
    h.api.fail_beacons.store(true, Ordering::SeqCst);
    let guard = h.guard();
    assert!(guard.check_access());

    let beacon = guard.logout().unwrap();
    assert_eq!(h.navigator.last().unwrap().1, "logged out");
    beacon.await.unwrap();
    assert_eq!(h.api.logout_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_log_action_posts_audit_entry() {
    let h = Harness::new();
    let token = h.login(3600);
    let guard = h.guard();
    assert!(guard.check_access());

    let details = HashMap::from([("reason".to_string(), json!("overdue"))]);
    guard
        .log_action("company.suspend", "company_7", details)
        .unwrap()
        .await
        .unwrap();

    let calls = h.api.audit_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (sent_token, entry) = &calls[0];
    assert_eq!(sent_token, &token);
    assert_eq!(entry.action, "company.suspend");
    assert_eq!(entry.resource, "company_7");
    assert_eq!(entry.details["reason"], "overdue");
    assert_eq!(entry.timestamp, h.now());
}

#[tokio::test]
async fn test_log_action_without_session_is_dropped() {
    let h = Harness::new();
    let guard = h.guard();
    assert!(
        guard
            .log_action("company.suspend", "company_7", HashMap::new())
            .is_none()
    );
    assert!(h.api.audit_calls.lock().unwrap().is_empty());
}

// ── Status ───────────────────────────────────────────────────────

#[test]
fn test_user_summary_and_state() {
    let h = Harness::new();
    h.login(3700);
    let guard = h.guard();
    assert_eq!(guard.state(), SessionState::Unauthenticated);
    assert!(guard.user_summary().is_none());

    assert!(guard.check_access());
    let summary = guard.user_summary().unwrap();
    assert_eq!(summary.email, "admin@estate.test");
    assert_eq!(summary.full_name.as_deref(), Some("Tenant Admin"));
    assert_eq!(summary.expires_in, "1h 1m");
    assert!(matches!(guard.state(), SessionState::Authenticated(_)));

    h.clock.advance(3500);
    assert!(matches!(guard.state(), SessionState::Expiring { .. }));

    h.clock.advance(300);
    assert_eq!(guard.state(), SessionState::Expired);
    assert_eq!(guard.user_summary().unwrap().expires_in, "Session expired");
}
