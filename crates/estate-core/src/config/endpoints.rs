//! HTTP endpoint configuration.

use serde::{Deserialize, Serialize};

/// Base URL and paths of the session endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Scheme and host of the console backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Token renewal path.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Server-side revocation path.
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    /// Audit trail path.
    #[serde(default = "default_audit_path")]
    pub audit_path: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            refresh_path: default_refresh_path(),
            logout_path: default_logout_path(),
            audit_path: default_audit_path(),
            request_timeout_seconds: default_timeout(),
        }
    }
}

impl EndpointConfig {
    /// Joins the base URL with an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_refresh_path() -> String {
    "/api/admin/token-refresh/".to_string()
}

fn default_logout_path() -> String {
    "/api/admin/logout/".to_string()
}

fn default_audit_path() -> String {
    "/api/admin/audit-log/".to_string()
}

fn default_timeout() -> u64 {
    10
}
