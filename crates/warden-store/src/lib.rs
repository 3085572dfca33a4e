//! Durable storage for warden
//!
//! In-memory state is authoritative; the store is an eventually-consistent
//! append target. Write failures surface as [`StoreError`] so callers can
//! log them as `persistence_unavailable` and keep advancing.

mod sqlite;
mod traits;

pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
