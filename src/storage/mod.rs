//! Deduplicating file storage
//!
//! Stores uploaded content once per distinct checksum:
//! - `fingerprint`: MD5 content digests
//! - `index`: fingerprint -> stored name map, rebuilt from disk at startup
//! - `naming`: name validation and `stem_N.ext` collision candidates
//! - `dedup`: the store operation tying them together under one lock

pub mod dedup;
pub mod fingerprint;
pub mod index;
pub mod naming;
pub mod types;

pub use dedup::DedupStore;
pub use fingerprint::{fingerprint, fingerprint_reader, Fingerprint, FingerprintParseError};
pub use index::ContentIndex;
pub use types::*;
