//! Persisted key/value store trait.

use crate::result::AppResult;

/// Synchronous string key/value store that survives page reloads.
///
/// Writes are visible to every subsequent read in the same process, so
/// callers never need to cache values themselves.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key.
    fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value.
    fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> AppResult<()>;

    /// Check whether a key is present.
    fn contains(&self, key: &str) -> AppResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
