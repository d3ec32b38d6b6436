//! Opens the configured key/value backend.

use std::sync::Arc;

use tracing::info;

use estate_core::config::{StorageBackend, StorageConfig};
use estate_core::result::AppResult;
use estate_core::traits::KeyValueStore;

use crate::file::FileStore;
use crate::memory::MemoryStore;

/// Builds the store selected by `config`.
pub fn open_store(config: &StorageConfig) -> AppResult<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.backend {
        StorageBackend::Memory => {
            info!("Initializing in-memory credential storage");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::File => {
            info!(path = %config.path, "Initializing file credential storage");
            Arc::new(FileStore::open(&config.path)?)
        }
    };
    Ok(store)
}
