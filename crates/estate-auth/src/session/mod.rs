//! Session lifecycle: access verification, remaining-time math, renewal,
//! and teardown.

pub mod access;
pub mod guard;
pub mod refresher;
pub mod remaining;
pub mod state;

pub use access::{AccessPolicy, EndReason, verify_token};
pub use guard::{SessionGuard, UserSummary};
pub use refresher::TickOutcome;
pub use remaining::TimeRemaining;
pub use state::SessionState;
