//! Event names and the listener registry.

pub mod emitter;

/// The transport opened; authentication is in flight.
pub const CONNECTED: &str = "connected";
/// The server accepted the token.
pub const AUTHENTICATED: &str = "authenticated";
/// The transport closed or failed.
pub const DISCONNECTED: &str = "disconnected";
/// A transport failure or an unrecognised remote error code.
pub const ERROR: &str = "error";
/// The server rejected the token.
pub const AUTHENTICATION_FAILED: &str = "authentication_failed";
/// The server rejected the tenant.
pub const TENANT_INVALID: &str = "tenant_invalid";
