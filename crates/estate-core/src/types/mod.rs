//! Shared value types.

pub mod audit;
pub mod severity;

pub use audit::AuditEntry;
pub use severity::Severity;
