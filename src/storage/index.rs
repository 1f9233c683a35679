//! Content Index
//!
//! Maps content fingerprints to the names they are stored under. Built by
//! scanning the storage directory at startup, then appended to by the dedup
//! store. The directory itself is the only persisted state.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::Path;

use super::fingerprint::{fingerprint_reader, Fingerprint};
use super::types::StoreError;

/// In-memory `Fingerprint -> stored name` map
#[derive(Debug, Default)]
pub struct ContentIndex {
    entries: HashMap<Fingerprint, String>,
}

impl ContentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from the regular files directly under `dir`.
    ///
    /// Subdirectories are not descended into. When two files share content,
    /// whichever the directory listing yields last wins; listing order is
    /// platform-defined. Names that are not valid UTF-8 are skipped.
    pub fn build(dir: &Path) -> Result<Self, StoreError> {
        let mut index = Self::new();

        let entries = fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(dir, e))?;
            let path = entry.path();

            // Follows symlinks; dangling links are not files
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::io(path, e)),
            };
            if !metadata.is_file() {
                continue;
            }

            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };

            let file = File::open(&path).map_err(|e| StoreError::io(&path, e))?;
            let fingerprint = fingerprint_reader(file).map_err(|e| StoreError::io(&path, e))?;
            index.insert(fingerprint, name);
        }

        Ok(index)
    }

    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<&str> {
        self.entries.get(fingerprint).map(String::as_str)
    }

    /// Add a mapping, replacing any previous name for the fingerprint.
    ///
    /// Callers must have seen `lookup` return `None` for this fingerprint
    /// under the same lock.
    pub fn insert(&mut self, fingerprint: Fingerprint, name: String) -> Option<String> {
        self.entries.insert(fingerprint, name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
