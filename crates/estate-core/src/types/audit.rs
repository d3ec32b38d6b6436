//! Audit trail entry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One administrator action reported to the audit endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Action name, e.g. `"company.suspend"`.
    pub action: String,
    /// Identifier of the affected resource.
    pub resource: String,
    /// Free-form details.
    #[serde(default)]
    pub details: HashMap<String, serde_json::Value>,
    /// When the action happened.
    pub timestamp: DateTime<Utc>,
}
