//! Store result and error types

use std::io;
use std::path::PathBuf;

use serde::Serialize;

use super::fingerprint::Fingerprint;

// ============================================================================
// Constants
// ============================================================================

/// Default cap on candidate names tried for one upload
pub const DEFAULT_MAX_NAME_ATTEMPTS: usize = 10_000;

// ============================================================================
// Store Results
// ============================================================================

/// What a store call did with the content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOutcome {
    /// Same content was already stored; nothing was written
    AlreadyExists,
    /// Content was new and has been written to disk
    Stored,
}

/// Result of storing content under a requested name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreResult {
    pub outcome: StoreOutcome,

    /// Fingerprint of the stored content
    pub fingerprint: Fingerprint,

    /// Name the content lives under in the storage directory
    pub final_name: String,

    /// Requested name, when collision resolution picked a different one
    pub renamed_from: Option<String>,
}

impl StoreResult {
    pub(crate) fn already_exists(fingerprint: Fingerprint, existing: String) -> Self {
        Self {
            outcome: StoreOutcome::AlreadyExists,
            fingerprint,
            final_name: existing,
            renamed_from: None,
        }
    }

    pub(crate) fn stored(fingerprint: Fingerprint, final_name: String, requested: &str) -> Self {
        let renamed_from = (final_name != requested).then(|| requested.to_string());
        Self {
            outcome: StoreOutcome::Stored,
            fingerprint,
            final_name,
            renamed_from,
        }
    }

    /// Whether the content was new but landed under a generated name
    pub fn is_renamed(&self) -> bool {
        self.renamed_from.is_some()
    }
}

/// Tuning for the dedup store
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Maximum candidate names tried per upload, the requested name included
    pub max_name_attempts: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_name_attempts: DEFAULT_MAX_NAME_ATTEMPTS,
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors returned by the dedup store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error at {path:?}: {source}")]
    StorageIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No free name for {requested:?} after {attempts} attempts")]
    NamingExhausted { requested: String, attempts: usize },

    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    /// The write failed and the partial file could not be removed either
    #[error("Storage I/O error at {path:?}: {source}; partial file left behind: {cleanup}")]
    PartialFileLeft {
        path: PathBuf,
        #[source]
        source: io::Error,
        cleanup: io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::StorageIo {
            path: path.into(),
            source,
        }
    }
}
