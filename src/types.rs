//! Shared error and result types.

use thiserror::Error;

/// Errors surfaced by the matching engine and its store backends.
#[derive(Debug, Error)]
pub enum HelpmatchError {
    /// Store-level failure (connection, query, write).
    #[error("database error: {0}")]
    Database(String),

    /// A document the current call depends on does not exist.
    ///
    /// Missing sender or missing designated forced receiver. A batch sweep
    /// catches this per-item and moves on; a single-item call fails.
    #[error("missing record: {0}")]
    MissingRecord(String),

    /// Invalid configuration detected at startup.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HelpmatchError>;
