//! Kindred Storage Layer
//!
//! Implements the [`KinshipStore`](kindred_domain::KinshipStore) trait twice:
//!
//! - [`SqliteStore`]: persistent storage; every change set commits inside one
//!   SQLite transaction with per-record version checks
//! - [`MemoryStore`]: in-memory maps for tests and embedding, with the same
//!   all-or-nothing commit semantics
//!
//! # Examples
//!
//! ```no_run
//! use kindred_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for registry and workflow operations
//! ```

#![warn(missing_docs)]

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
