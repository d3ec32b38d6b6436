//! # estate-console
//!
//! Session lifecycle and realtime channel manager for the estate
//! tenant-admin console.
//!
//! A [`ConsoleContext`] owns one [`SessionGuard`] and one
//! [`RealtimeChannel`] sharing a single credential store. Build it once,
//! [`boot`](ConsoleContext::boot) it before protected content renders, and
//! [`shutdown`](ConsoleContext::shutdown) it on teardown.

pub mod context;
pub mod logging;

pub use context::ConsoleContext;
pub use estate_auth::SessionGuard;
pub use estate_realtime::RealtimeChannel;
