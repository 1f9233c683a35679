//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::storage::{DedupStore, StoreError};

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to open storage: {0}")]
    Storage(#[from] StoreError),

    #[error("Index build task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: DedupStore,
}

impl AppState {
    /// Wrap an already opened store
    pub fn new(config: Config, store: DedupStore) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store }),
        }
    }

    /// Create the storage directory if needed and index its contents.
    ///
    /// Hashing every stored file is blocking work, so it runs on the
    /// blocking pool.
    pub async fn open(config: Config) -> Result<Self, StateError> {
        let data_dir = config.storage.data_dir.clone();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| StoreError::StorageIo {
                path: data_dir.clone(),
                source: e,
            })?;

        let options = config.storage.store_options();
        let store = tokio::task::spawn_blocking(move || DedupStore::open(data_dir, options)).await??;

        Ok(Self::new(config, store))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the dedup store
    pub fn store(&self) -> &DedupStore {
        &self.inner.store
    }
}
