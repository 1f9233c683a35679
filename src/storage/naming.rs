//! Stored-name rules and collision candidates

use super::types::StoreError;

/// Split a file name into stem and extension.
///
/// The extension starts at the last dot and keeps it (`"a.tar.gz"` gives
/// `("a.tar", ".gz")`). Leading dots never start an extension, so
/// `".profile"` has none.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if name[..dot].bytes().any(|b| b != b'.') => name.split_at(dot),
        _ => (name, ""),
    }
}

/// Check that a name is a single, plain path component
pub fn validate(name: &str) -> Result<(), StoreError> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);

    if plain {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

/// Candidate names for a requested name, in the order they are tried.
///
/// The requested name comes first, then `stem_2.ext`, `stem_3.ext`, ...
/// The unsuffixed original counts as copy 1.
pub struct Candidates<'a> {
    requested: &'a str,
    stem: &'a str,
    extension: &'a str,
    next: usize,
    remaining: usize,
}

impl<'a> Candidates<'a> {
    pub fn new(requested: &'a str, max_attempts: usize) -> Self {
        let (stem, extension) = split_name(requested);
        Self {
            requested,
            stem,
            extension,
            next: 1,
            remaining: max_attempts,
        }
    }
}

impl Iterator for Candidates<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let n = self.next;
        self.next += 1;

        Some(if n == 1 {
            self.requested.to_string()
        } else {
            format!("{}_{}{}", self.stem, n, self.extension)
        })
    }
}
