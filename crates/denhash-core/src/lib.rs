//! DenHash Core — log-structured single-file key-value engine
//!
//! Each database is one file: an append-only log of CRC32C-checksummed
//! records replayed into a RAM hash table on open.
//!
//! # Architecture
//!
//! - **Read path**: Serve directly from RAM hash table
//! - **Write path**: Log-first, then RAM update (crash-safe)
//! - **Cursor**: `first_key`/`next_key` walk the index in ascending byte order
//!
//! # No Mapping Semantics
//!
//! This crate has no opinion about access modes, handle lifecycles, or
//! dictionary-shaped operations. Those live in the facade crate
//! (denhash-dbm), which drives this engine through its handle API.

pub mod config;
pub mod durability;
pub mod engine;
pub mod error;
pub mod format;
pub mod log;

// Re-export key types for convenience
pub use config::Config;
pub use engine::{DenEngine, OpenFlags};
pub use error::{DenError, DenResult};
pub use format::Operation;
pub use log::{LogReader, LogWriter};
