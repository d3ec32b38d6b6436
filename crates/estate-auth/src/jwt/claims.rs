//! Claims carried by the console's bearer token.
//!
//! These are decoded without signature verification. They decide what the
//! console renders and when it warns; the server re-authorizes every
//! privileged call on its own.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Raw token payload. Every field is optional so that validation can report
/// exactly which requirement failed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    /// Subject (user ID). Accepts a string or a number.
    #[serde(default, alias = "sub", deserialize_with = "id_string")]
    pub user_id: Option<String>,
    /// Email of the user.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Role name.
    #[serde(default)]
    pub role: Option<String>,
    /// Whether the user is a platform administrator.
    #[serde(default)]
    pub is_system_admin: bool,
    /// Administrator level tag.
    #[serde(default)]
    pub admin_level: Option<String>,
    /// Issuing tenant.
    #[serde(default, deserialize_with = "id_string")]
    pub company_id: Option<String>,
    /// Scope tag.
    #[serde(default)]
    pub scope: Option<String>,
    /// Expiration (seconds since epoch, fractional allowed).
    #[serde(default)]
    pub exp: Option<f64>,
}

impl Claims {
    /// Returns the expiration instant, if the token carries a usable one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.exp?;
        if !exp.is_finite() {
            return None;
        }
        DateTime::from_timestamp_millis((exp * 1000.0) as i64)
    }
}

/// Roles known to the estate platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Company or platform administrator.
    Admin,
    /// Property client.
    Client,
    /// Sales marketer.
    Marketer,
    /// Support staff.
    Support,
}

impl Role {
    /// Exact, case-sensitive parse.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "admin" => Some(Self::Admin),
            "client" => Some(Self::Client),
            "marketer" => Some(Self::Marketer),
            "support" => Some(Self::Support),
            _ => None,
        }
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Client => "client",
            Self::Marketer => "marketer",
            Self::Support => "support",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrator level tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminLevel {
    /// Platform-level administrator.
    System,
    /// Tenant-level administrator.
    Company,
    /// No administrative access.
    None,
}

impl AdminLevel {
    /// The levels that grant any administrative access.
    pub const ADMIN_LEVELS: [AdminLevel; 2] = [AdminLevel::System, AdminLevel::Company];

    /// Exact, case-sensitive parse. `"company"` never matches `"companyx"`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "system" => Some(Self::System),
            "company" => Some(Self::Company),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// Return the level as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Company => "company",
            Self::None => "none",
        }
    }

    /// Whether this level is one of [`AdminLevel::ADMIN_LEVELS`].
    pub fn is_admin(&self) -> bool {
        Self::ADMIN_LEVELS.contains(self)
    }
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims of a token that passed every access check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionClaims {
    /// Subject id.
    pub user_id: String,
    /// Email.
    pub email: String,
    /// Display name.
    pub full_name: Option<String>,
    /// Role, when the token names a known one.
    pub role: Option<Role>,
    /// Platform administrator flag.
    pub is_system_admin: bool,
    /// Admin level, when the token names a known one.
    pub admin_level: Option<AdminLevel>,
    /// Scope tag.
    pub scope: String,
    /// Issuing tenant.
    pub company_id: Option<String>,
    /// Expiration instant.
    pub expires_at: DateTime<Utc>,
}

/// A bearer token together with the claims decoded from it.
///
/// The two are only ever built together, so a holder never sees a token
/// without its matching claims.
#[derive(Clone, PartialEq)]
pub struct Credential {
    token: String,
    claims: SessionClaims,
}

impl Credential {
    pub(crate) fn new(token: String, claims: SessionClaims) -> Self {
        Self { token, claims }
    }

    /// The opaque bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The decoded claims.
    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }

    /// Expiration instant of the token.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("claims", &self.claims)
            .finish()
    }
}

fn id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
