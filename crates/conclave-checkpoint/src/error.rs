//! Errors produced by checkpoint backends.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Failure saving, loading, or resuming a checkpoint.
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no checkpoint found for thread '{0}'")]
    NotFound(String),

    #[error("thread '{thread_id}' has no pending interrupt to resume")]
    NoPendingInterrupt { thread_id: String },

    #[error("checkpoint store corrupted: {0}")]
    Corrupt(String),
}
