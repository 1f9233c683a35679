//! Dedup Store
//!
//! Single entry point for accepting content under a requested name. Identical
//! content is stored once; new content whose name is already taken on disk is
//! stored under `stem_N.ext` instead of overwriting.
//!
//! The index lock is held from lookup until the new entry is inserted, which
//! covers name selection and the write. Two concurrent stores of the same
//! content therefore write exactly one file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
#[cfg(test)]
use parking_lot::MutexGuard;

use super::fingerprint::{fingerprint, Fingerprint};
use super::index::ContentIndex;
use super::naming::{self, Candidates};
use super::types::{StoreError, StoreOptions, StoreResult};

/// Content-deduplicating file store rooted at one directory
#[derive(Debug)]
pub struct DedupStore {
    root: PathBuf,
    index: Mutex<ContentIndex>,
    options: StoreOptions,
}

impl DedupStore {
    /// Open a store, indexing whatever is already in `root`
    pub fn open(root: impl Into<PathBuf>, options: StoreOptions) -> Result<Self, StoreError> {
        let root = root.into();
        let index = ContentIndex::build(&root)?;
        Ok(Self::with_index(root, index, options))
    }

    /// Create a store around an index that was built elsewhere
    pub fn with_index(root: impl Into<PathBuf>, index: ContentIndex, options: StoreOptions) -> Self {
        Self {
            root: root.into(),
            index: Mutex::new(index),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name the given content is stored under, if any
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<String> {
        self.index.lock().lookup(fingerprint).map(str::to_string)
    }

    /// Number of distinct contents known to the index
    pub fn len(&self) -> usize {
        self.index.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.lock().is_empty()
    }

    #[cfg(test)]
    pub(crate) fn lock_index(&self) -> MutexGuard<'_, ContentIndex> {
        self.index.lock()
    }

    /// Resolve a stored name to its path under the storage directory
    pub fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        naming::validate(name)?;
        Ok(self.root.join(name))
    }

    /// Store `content` under `requested_name`, or report where it already is.
    ///
    /// On a fingerprint hit nothing touches the disk. On a write failure the
    /// partial file is removed and the index is left unchanged.
    pub fn store(&self, content: &[u8], requested_name: &str) -> Result<StoreResult, StoreError> {
        naming::validate(requested_name)?;

        let fingerprint = fingerprint(content);

        let mut index = self.index.lock();
        if let Some(existing) = index.lookup(&fingerprint) {
            return Ok(StoreResult::already_exists(fingerprint, existing.to_string()));
        }

        let final_name = self.write_new(content, requested_name)?;
        index.insert(fingerprint, final_name.clone());
        drop(index);

        Ok(StoreResult::stored(fingerprint, final_name, requested_name))
    }

    /// Write content to the first free candidate name. Caller holds the lock.
    fn write_new(&self, content: &[u8], requested_name: &str) -> Result<String, StoreError> {
        for candidate in Candidates::new(requested_name, self.options.max_name_attempts) {
            let path = self.root.join(&candidate);

            // create_new never clobbers a file that appeared out-of-band
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StoreError::io(path, e)),
            };

            if let Err(e) = file.write_all(content).and_then(|()| file.flush()) {
                drop(file);
                return Err(discard_partial(path, e));
            }

            return Ok(candidate);
        }

        Err(StoreError::NamingExhausted {
            requested: requested_name.to_string(),
            attempts: self.options.max_name_attempts,
        })
    }
}

/// Remove a file whose write failed. A failed removal is reported alongside
/// the write error instead of being dropped.
fn discard_partial(path: PathBuf, source: io::Error) -> StoreError {
    match fs::remove_file(&path) {
        Ok(()) => StoreError::io(path, source),
        Err(e) if e.kind() == io::ErrorKind::NotFound => StoreError::io(path, source),
        Err(cleanup) => StoreError::PartialFileLeft {
            path,
            source,
            cleanup,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::StoreOutcome;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    fn open_store(temp_dir: &TempDir) -> DedupStore {
        DedupStore::open(temp_dir.path(), StoreOptions::default()).unwrap()
    }

    fn file_count(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_store_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        let first = store.store(b"hello", "x.txt").unwrap();
        assert_eq!(first.outcome, StoreOutcome::Stored);
        assert_eq!(first.final_name, "x.txt");
        assert!(!first.is_renamed());

        let second = store.store(b"hello", "y.txt").unwrap();
        assert_eq!(second.outcome, StoreOutcome::AlreadyExists);
        assert_eq!(second.final_name, "x.txt");
        assert_eq!(second.renamed_from, None);

        let third = store.store(b"world", "x.txt").unwrap();
        assert_eq!(third.outcome, StoreOutcome::Stored);
        assert_eq!(third.final_name, "x_2.txt");
        assert_eq!(third.renamed_from.as_deref(), Some("x.txt"));

        assert_eq!(fs::read(temp_dir.path().join("x.txt")).unwrap(), b"hello");
        assert_eq!(fs::read(temp_dir.path().join("x_2.txt")).unwrap(), b"world");
        assert!(!temp_dir.path().join("y.txt").exists());
    }

    #[test]
    fn test_duplicate_content_stored_once() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        let first = store.store(b"same bytes", "first.png").unwrap();
        for name in ["second.png", "first.png", "third.gif"] {
            let result = store.store(b"same bytes", name).unwrap();
            assert_eq!(result.outcome, StoreOutcome::AlreadyExists);
            assert_eq!(result.final_name, first.final_name);
            assert_eq!(result.fingerprint, first.fingerprint);
        }

        assert_eq!(file_count(temp_dir.path()), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_collision_with_unrelated_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.jpg"), b"pre-existing").unwrap();
        let store = open_store(&temp_dir);

        let second = store.store(b"new content", "a.jpg").unwrap();
        assert_eq!(second.outcome, StoreOutcome::Stored);
        assert_eq!(second.final_name, "a_2.jpg");

        let third = store.store(b"other content", "a.jpg").unwrap();
        assert_eq!(third.outcome, StoreOutcome::Stored);
        assert_eq!(third.final_name, "a_3.jpg");

        assert_eq!(fs::read(temp_dir.path().join("a.jpg")).unwrap(), b"pre-existing");
    }

    #[test]
    fn test_collision_with_file_added_out_of_band() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        // Not in the index, but present on disk
        fs::write(temp_dir.path().join("late.txt"), b"sneaked in").unwrap();

        let result = store.store(b"mine", "late.txt").unwrap();
        assert_eq!(result.final_name, "late_2.txt");
        assert_eq!(fs::read(temp_dir.path().join("late.txt")).unwrap(), b"sneaked in");
    }

    #[test]
    fn test_dedup_hit_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        store.store(b"payload", "p.bin").unwrap();
        let path = temp_dir.path().join("p.bin");
        let modified_before = fs::metadata(&path).unwrap().modified().unwrap();
        let count_before = file_count(temp_dir.path());

        let result = store.store(b"payload", "q.bin").unwrap();
        assert_eq!(result.outcome, StoreOutcome::AlreadyExists);

        assert_eq!(file_count(temp_dir.path()), count_before);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified_before);
    }

    #[test]
    fn test_rebuild_after_restart() {
        let temp_dir = TempDir::new().unwrap();
        let mut stored = Vec::new();
        {
            let store = open_store(&temp_dir);
            for (content, name) in [
                (&b"one"[..], "img.jpg"),
                (&b"two"[..], "img.jpg"),
                (&b"three"[..], "img.jpg"),
                (&b"four"[..], "other.png"),
            ] {
                let result = store.store(content, name).unwrap();
                stored.push((result.fingerprint, result.final_name));
            }
        }

        let reopened = open_store(&temp_dir);
        assert_eq!(reopened.len(), stored.len());
        for (fingerprint, name) in &stored {
            assert_eq!(reopened.lookup(fingerprint).as_deref(), Some(name.as_str()));
        }

        let again = reopened.store(b"two", "whatever.jpg").unwrap();
        assert_eq!(again.outcome, StoreOutcome::AlreadyExists);
        assert_eq!(again.final_name, "img_2.jpg");
    }

    #[test]
    fn test_concurrent_identical_stores() {
        const WORKERS: usize = 16;

        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(open_store(&temp_dir));
        let barrier = Arc::new(Barrier::new(WORKERS));

        let handles: Vec<_> = (0..WORKERS)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.store(b"raced content", &format!("race_{i}.dat")).unwrap()
                })
            })
            .collect();

        let results: Vec<StoreResult> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let stored: Vec<_> = results
            .iter()
            .filter(|r| r.outcome == StoreOutcome::Stored)
            .collect();
        assert_eq!(stored.len(), 1);

        let winner = &stored[0].final_name;
        assert!(results.iter().all(|r| &r.final_name == winner));
        assert_eq!(file_count(temp_dir.path()), 1);
        assert_eq!(fs::read(temp_dir.path().join(winner)).unwrap(), b"raced content");
    }

    #[test]
    fn test_concurrent_distinct_content_same_name() {
        const WORKERS: usize = 8;

        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(open_store(&temp_dir));
        let barrier = Arc::new(Barrier::new(WORKERS));

        let handles: Vec<_> = (0..WORKERS)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let content = format!("content {i}");
                    (content.clone(), store.store(content.as_bytes(), "shared.txt").unwrap())
                })
            })
            .collect();

        let mut names = Vec::new();
        for handle in handles {
            let (content, result) = handle.join().unwrap();
            assert_eq!(result.outcome, StoreOutcome::Stored);
            let on_disk = fs::read(temp_dir.path().join(&result.final_name)).unwrap();
            assert_eq!(on_disk, content.as_bytes());
            names.push(result.final_name);
        }

        names.sort();
        names.dedup();
        assert_eq!(names.len(), WORKERS);
        assert_eq!(file_count(temp_dir.path()), WORKERS);
    }

    #[test]
    fn test_naming_exhausted() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.jpg"), b"1").unwrap();
        fs::write(temp_dir.path().join("a_2.jpg"), b"2").unwrap();
        let store = DedupStore::open(
            temp_dir.path(),
            StoreOptions { max_name_attempts: 2 },
        )
        .unwrap();

        let result = store.store(b"3", "a.jpg");
        assert!(matches!(
            result,
            Err(StoreError::NamingExhausted { attempts: 2, .. })
        ));
        assert_eq!(store.lookup(&fingerprint(b"3")), None);
        assert_eq!(file_count(temp_dir.path()), 2);
    }

    #[test]
    fn test_invalid_name_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        for name in ["", "..", "../escape.txt", "sub/dir.txt"] {
            let result = store.store(b"data", name);
            assert!(matches!(result, Err(StoreError::InvalidName(_))));
        }
        assert!(store.is_empty());
        assert_eq!(file_count(temp_dir.path()), 0);
    }

    #[test]
    fn test_write_failure_leaves_index_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let missing_root = temp_dir.path().join("gone");
        let store = DedupStore::with_index(&missing_root, ContentIndex::new(), StoreOptions::default());

        let result = store.store(b"data", "file.txt");
        assert!(matches!(result, Err(StoreError::StorageIo { .. })));
        assert_eq!(store.lookup(&fingerprint(b"data")), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_path_for() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        assert_eq!(store.path_for("a.jpg").unwrap(), temp_dir.path().join("a.jpg"));
        assert!(store.path_for("../a.jpg").is_err());
    }

    #[test]
    fn test_discard_partial_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("half.jpg");
        fs::write(&path, b"half").unwrap();

        let err = discard_partial(path.clone(), io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(matches!(err, StoreError::StorageIo { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_discard_partial_reports_failed_cleanup() {
        let temp_dir = TempDir::new().unwrap();
        // remove_file refuses directories, standing in for an undeletable file
        let path = temp_dir.path().join("stuck");
        fs::create_dir(&path).unwrap();

        let err = discard_partial(path.clone(), io::Error::new(io::ErrorKind::Other, "disk full"));
        match err {
            StoreError::PartialFileLeft {
                path: left,
                source,
                cleanup,
            } => {
                assert_eq!(left, path);
                assert_eq!(source.to_string(), "disk full");
                assert_ne!(cleanup.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(path.exists());
    }
}
