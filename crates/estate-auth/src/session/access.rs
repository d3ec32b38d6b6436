//! Access verification of a stored bearer token.

use chrono::{DateTime, Utc};
use thiserror::Error;

use estate_core::config::SessionConfig;
use estate_core::error::{AppError, ErrorKind};

use crate::jwt::{AdminLevel, Credential, Role, SessionClaims, decode_claims};

/// Why a session ended. The display string is the reason shown to the user
/// and appended to the redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EndReason {
    /// No token is stored.
    #[error("Authentication required")]
    AuthenticationRequired,
    /// The token could not be decoded or carries no expiry.
    #[error("Invalid authentication token")]
    InvalidToken,
    /// The token expiry has passed.
    #[error("expired")]
    Expired,
    /// Subject id or email is missing.
    #[error("Missing required claims")]
    MissingClaims,
    /// The administrator flag is not set.
    #[error("Not a system administrator")]
    NotSystemAdmin,
    /// The admin level differs from the required one.
    #[error("Invalid admin level")]
    InvalidAdminLevel,
    /// The scope differs from the required one.
    #[error("Invalid scope for Tenant Admin")]
    InvalidScope,
    /// The renewal endpoint failed.
    #[error("session expired")]
    RenewalFailed,
    /// The user logged out.
    #[error("logged out")]
    LoggedOut,
}

impl EndReason {
    /// Whether the user is authenticated but lacks privileges, as opposed to
    /// needing to log in again.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::NotSystemAdmin | Self::InvalidAdminLevel | Self::InvalidScope
        )
    }

    /// Page the user is sent to.
    pub fn destination<'a>(&self, config: &'a SessionConfig) -> &'a str {
        if self.is_denial() {
            &config.access_denied_path
        } else {
            &config.login_path
        }
    }

    /// Error kind this reason maps to.
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            Self::NotSystemAdmin | Self::InvalidAdminLevel | Self::InvalidScope => {
                ErrorKind::Authorization
            }
            Self::RenewalFailed => ErrorKind::Renewal,
            Self::AuthenticationRequired
            | Self::InvalidToken
            | Self::Expired
            | Self::MissingClaims
            | Self::LoggedOut => ErrorKind::Credential,
        }
    }
}

impl From<EndReason> for AppError {
    fn from(reason: EndReason) -> Self {
        AppError::new(reason.error_kind(), reason.to_string())
    }
}

/// Claims a token must carry to enter the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Required admin level tag, compared exactly.
    pub required_admin_level: String,
    /// Required scope tag, compared exactly.
    pub required_scope: String,
}

impl AccessPolicy {
    /// Builds the policy from session configuration.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            required_admin_level: config.required_admin_level.clone(),
            required_scope: config.required_scope.clone(),
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

/// Verifies a stored token against `policy`.
///
/// Checks run in a fixed order and the first failure wins. Expiry is checked
/// before every other claim, so an expired token always reports
/// [`EndReason::Expired`].
pub fn verify_token(
    token: Option<&str>,
    policy: &AccessPolicy,
    now: DateTime<Utc>,
) -> Result<Credential, EndReason> {
    let token = match token.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return Err(EndReason::AuthenticationRequired),
    };

    let claims = decode_claims(token).map_err(|_| EndReason::InvalidToken)?;

    // A token without a usable expiry cannot be expired, only invalid.
    let expires_at = claims.expires_at().ok_or(EndReason::InvalidToken)?;
    if expires_at <= now {
        return Err(EndReason::Expired);
    }

    let (user_id, email) = match (&claims.user_id, &claims.email) {
        (Some(id), Some(email)) if !email.trim().is_empty() => (id.clone(), email.clone()),
        _ => return Err(EndReason::MissingClaims),
    };

    if !claims.is_system_admin {
        return Err(EndReason::NotSystemAdmin);
    }
    if claims.admin_level.as_deref() != Some(policy.required_admin_level.as_str()) {
        return Err(EndReason::InvalidAdminLevel);
    }
    if claims.scope.as_deref() != Some(policy.required_scope.as_str()) {
        return Err(EndReason::InvalidScope);
    }

    let session_claims = SessionClaims {
        user_id,
        email,
        full_name: claims.full_name.clone(),
        role: claims.role.as_deref().and_then(Role::parse),
        is_system_admin: claims.is_system_admin,
        admin_level: claims.admin_level.as_deref().and_then(AdminLevel::parse),
        scope: policy.required_scope.clone(),
        company_id: claims.company_id.clone(),
        expires_at,
    };

    Ok(Credential::new(token.to_string(), session_claims))
}
