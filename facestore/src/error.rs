use std::fmt::Display;

use thiserror::Error;

/// Errors that can occur in face storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("facestore: storage error: {0}")]
    Storage(String),

    #[error("facestore: serialization error: {0}")]
    Serialization(String),

    #[error("facestore: cluster {0} already has a record")]
    Conflict(u32),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

pub(crate) fn storage<E: Display>(e: E) -> StoreError {
    StoreError::Storage(e.to_string())
}
