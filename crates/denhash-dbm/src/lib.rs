//! DBM-style mapping facade for DenHash
//!
//! Treats an on-disk DenHash database as an associative container: open it
//! under an access mode, mutate and query it with map-shaped operations,
//! iterate its entries, and close it deterministically.
//!
//! # Architecture
//!
//! The facade reconciles two contracts: the engine's explicit handle
//! lifecycle (open or closed, with closed-handle calls failing predictably)
//! and the always-available feel of an in-memory mapping.
//!
//! - Each `DenHash` owns exactly one engine handle, never shared
//! - Every operation checks the open/closed state before reaching the engine
//! - Enumeration walks the engine's `first_key`/`next_key` cursor; the
//!   strictly-increasing position tolerates mutation mid-iteration
//! - `replace`/`update` merge from any [`EntrySource`], not just `DenHash`
//!
//! # Example
//!
//! ```no_run
//! use denhash_dbm::{DenHash, OpenMode};
//!
//! # fn main() -> Result<(), denhash_dbm::DbmError> {
//! let db = DenHash::open("/tmp/example.den", 0o644, OpenMode::Wrcreat)?;
//! db.store(b"greeting", b"hello")?;
//! assert_eq!(db.get(b"greeting")?, Some(b"hello".to_vec()));
//! db.close()?;
//! # Ok(())
//! # }
//! ```

mod adapter;

pub mod dbm;
pub mod error;
pub mod iter;
pub mod mode;

pub use dbm::DenHash;
pub use error::{DbmError, DbmResult};
pub use iter::{EntrySource, Pairs};
pub use mode::OpenMode;

// Engine configuration is part of the open API
pub use denhash_core::Config;
