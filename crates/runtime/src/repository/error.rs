//! Error types raised by repository implementations.

use thiserror::Error;

/// Errors surfaced by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("location repository lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    /// Injected by test doubles to exercise write-failure paths.
    #[error("repository rejected write: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
