//! HTTP surface the session guard consumes.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::AuditEntry;

/// Server endpoints for renewing, revoking, and auditing a session.
#[async_trait]
pub trait SessionApi: Send + Sync + std::fmt::Debug + 'static {
    /// Exchanges `token` for a renewed token.
    async fn refresh(&self, token: &str) -> AppResult<String>;

    /// Revokes `token` server-side.
    async fn logout(&self, token: &str) -> AppResult<()>;

    /// Appends an entry to the server-side audit trail.
    async fn audit(&self, token: &str, entry: &AuditEntry) -> AppResult<()>;
}
