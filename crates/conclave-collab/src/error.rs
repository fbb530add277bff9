//! Errors surfaced by collaborator ports.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CollabError>;

#[derive(Error, Debug)]
pub enum CollabError {
    #[error("LLM adapter error: {0}")]
    Llm(String),

    #[error("sandbox execution error: {0}")]
    Sandbox(String),

    #[error("analyzer error: {0}")]
    Analyzer(String),

    #[error("vault indexer error: {0}")]
    Vault(String),

    #[error("collaborator timed out after {0}s")]
    Timeout(u64),
}
