//! [`VaultIndexer`]: publishes a finalized design's metadata to whatever
//! external knowledge base ("the vault") downstream tooling searches.
//! Entirely optional — a run with no configured vault just uses
//! [`NullVaultIndexer`] and skips the step's effect.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait VaultIndexer: Send + Sync {
    async fn index(&self, design_id: &str, metadata: Value) -> Result<()>;

    /// Retrieves up to `limit` vault entries relevant to `query`, for the
    /// supervisor (§4.3) and proposal worker (§4.5) to fold into their
    /// prompts as prior-art context.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Value>>;
}

/// Does nothing. The default when no vault is configured.
pub struct NullVaultIndexer;

#[async_trait]
impl VaultIndexer for NullVaultIndexer {
    async fn index(&self, _design_id: &str, _metadata: Value) -> Result<()> {
        Ok(())
    }

    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }
}
