//! Storage key names.
//!
//! Centralising key construction prevents typos and makes it easy to find
//! every key the console persists.

/// Bearer token of the current session.
pub const AUTH_TOKEN: &str = "auth_token";

/// Last-known user snapshot for warm display.
pub const USER: &str = "user";

/// Last-selected tenant snapshot.
pub const TENANT: &str = "tenant";

/// Every key that belongs to a session; cleared together on teardown.
pub const SESSION_KEYS: [&str; 3] = [AUTH_TOKEN, USER, TENANT];
