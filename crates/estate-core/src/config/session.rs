//! Session guard configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Session guard configuration: access requirements and renewal timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Period of the auto-refresh tick in seconds.
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    /// Remaining lifetime below which the token is renewed.
    #[serde(default = "default_refresh_threshold")]
    pub refresh_threshold_seconds: u64,
    /// Remaining lifetime below which the user is warned once.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold_seconds: u64,
    /// Admin level a token must carry to enter the console.
    #[serde(default = "default_admin_level")]
    pub required_admin_level: String,
    /// Scope a token must carry to enter the console.
    #[serde(default = "default_scope")]
    pub required_scope: String,
    /// Path of the login page.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Path of the access-denied page.
    #[serde(default = "default_denied_path")]
    pub access_denied_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: default_check_interval(),
            refresh_threshold_seconds: default_refresh_threshold(),
            warning_threshold_seconds: default_warning_threshold(),
            required_admin_level: default_admin_level(),
            required_scope: default_scope(),
            login_path: default_login_path(),
            access_denied_path: default_denied_path(),
        }
    }
}

impl SessionConfig {
    /// Rejects timing combinations the auto-refresh loop cannot honour.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.check_interval_seconds == 0 {
            return Err(AppError::configuration(
                "session.check_interval_seconds must be greater than zero",
            ));
        }
        if self.warning_threshold_seconds >= self.refresh_threshold_seconds {
            return Err(AppError::configuration(format!(
                "session.refresh_threshold_seconds ({}) must be greater than warning_threshold_seconds ({})",
                self.refresh_threshold_seconds, self.warning_threshold_seconds
            )));
        }
        Ok(())
    }
}

fn default_check_interval() -> u64 {
    60
}

fn default_refresh_threshold() -> u64 {
    600
}

fn default_warning_threshold() -> u64 {
    300
}

fn default_admin_level() -> String {
    "system".to_string()
}

fn default_scope() -> String {
    "tenant_admin".to_string()
}

fn default_login_path() -> String {
    "/tenant-admin/login/".to_string()
}

fn default_denied_path() -> String {
    "/tenant-admin/access-denied/".to_string()
}
