//! Errors produced by design record storage backends.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no design record found with id '{0}'")]
    NotFound(String),

    #[error("design record '{0}' already exists")]
    AlreadyExists(String),
}
