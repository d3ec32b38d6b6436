//! The credential store shared by every component of a console context.
//!
//! This is the single owner of the persisted bearer token. Components read
//! it synchronously on each use instead of keeping their own copies, so a
//! renewed token is visible to the next reader immediately.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use estate_core::result::AppResult;
use estate_core::traits::KeyValueStore;

use crate::keys;

/// Last-known user details kept for display before validation completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    /// Subject id.
    pub id: String,
    /// Email address.
    pub email: String,
    /// Display name.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Admin level tag.
    #[serde(default)]
    pub admin_level: Option<String>,
    /// Tenant the user belongs to.
    #[serde(default)]
    pub company_id: Option<String>,
}

/// Last-selected tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantSnapshot {
    /// Tenant id.
    pub id: String,
    /// Tenant display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Typed access to the session keys of a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    /// Wraps a key/value backend.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Current bearer token. Read failures count as "no token".
    pub fn token(&self) -> Option<String> {
        match self.backend.get(keys::AUTH_TOKEN) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                None
            }
        }
    }

    /// Replaces the bearer token.
    pub fn set_token(&self, token: &str) -> AppResult<()> {
        self.backend.set(keys::AUTH_TOKEN, token)
    }

    /// Last-known user snapshot, if present and parseable.
    pub fn user(&self) -> Option<UserSnapshot> {
        self.read_json(keys::USER)
    }

    /// Stores the user snapshot.
    pub fn set_user(&self, user: &UserSnapshot) -> AppResult<()> {
        self.backend.set(keys::USER, &serde_json::to_string(user)?)
    }

    /// Last-selected tenant, if present and parseable.
    pub fn tenant(&self) -> Option<TenantSnapshot> {
        self.read_json(keys::TENANT)
    }

    /// Stores the selected tenant.
    pub fn set_tenant(&self, tenant: &TenantSnapshot) -> AppResult<()> {
        self.backend.set(keys::TENANT, &serde_json::to_string(tenant)?)
    }

    /// Removes every session key. Individual failures are logged and the
    /// remaining keys are still removed.
    pub fn clear(&self) {
        for key in keys::SESSION_KEYS {
            if let Err(e) = self.backend.remove(key) {
                warn!(key, error = %e, "Failed to clear stored session key");
            }
        }
        debug!("Cleared stored session");
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read stored value");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key, error = %e, "Ignoring unparseable stored value");
                None
            }
        }
    }
}
