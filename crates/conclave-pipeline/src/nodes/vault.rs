//! Vault-index node (§4.14): publishes the finalized design's metadata to
//! the knowledge base. Best-effort — a vault outage doesn't fail a design
//! that otherwise succeeded.

use crate::state::{self, FIELD_EVENTS};
use async_trait::async_trait;
use conclave_collab::VaultIndexer;
use conclave_core::NodeExecutor;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct VaultIndexNode {
    pub indexer: Arc<dyn VaultIndexer>,
}

#[async_trait]
impl NodeExecutor for VaultIndexNode {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        let design = state::read_design(state);
        let metadata = json!({
            "prompt": design.prompt,
            "final_code": design.final_code,
            "rounds_run": design.rounds.len(),
            "constraints": design.constraints,
            "learner_data": state[crate::state::FIELD_LEARNER_DATA].clone(),
        });

        let (indexed, tag) = match self.indexer.index(&design.id.0, metadata).await {
            Ok(()) => (true, "learning:completed"),
            Err(e) => {
                tracing::warn!(design_id = %design.id, error = %e, "vault indexing failed, continuing");
                (false, "learning:failed")
            }
        };

        Ok(json!({
            FIELD_EVENTS: [{"tag": tag, "data": {"indexed": indexed}}],
        }))
    }
}
