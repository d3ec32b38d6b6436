//! # estate-auth
//!
//! Client-side session lifecycle for the estate tenant-admin console.
//!
//! ## Modules
//!
//! - `jwt`: unverified bearer-token decoding and the claims it carries
//! - `session`: access checks, remaining-time math, renewal, and logout
//! - `client`: HTTP implementation of the session endpoints
//!
//! Decoded claims only drive UI decisions (what to render, when to warn).
//! They are not a security boundary: every privileged server call is
//! re-authorized server-side.

pub mod client;
pub mod jwt;
pub mod session;

pub use client::HttpSessionApi;
pub use jwt::{AdminLevel, Claims, Credential, Role, SessionClaims};
pub use session::{
    AccessPolicy, EndReason, SessionGuard, SessionState, TickOutcome, TimeRemaining, UserSummary,
    verify_token,
};
