//! Dedup File Server Library
//!
//! A small file drop: uploads are stored once per distinct content checksum
//! and served back by name. The binary in main.rs wires these modules into
//! an axum server.
//!
//! # Modules
//!
//! - `storage`: content index and dedup store (no HTTP, no logging)
//! - `routes`: upload, download, pages and JSON API
//! - `config`, `logging`, `state`, `error`: service plumbing

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;
pub mod storage;
