//! # estate-storage
//!
//! Key/value persistence for the estate console and the credential store
//! shared by the session guard and the realtime channel.
//!
//! - **memory**: process-local map using [dashmap](https://crates.io/crates/dashmap)
//! - **file**: JSON file that survives restarts
//!
//! The backend is selected at runtime based on configuration.

pub mod credential;
pub mod file;
pub mod keys;
pub mod memory;
pub mod provider;

pub use credential::{CredentialStore, TenantSnapshot, UserSnapshot};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use provider::open_store;
