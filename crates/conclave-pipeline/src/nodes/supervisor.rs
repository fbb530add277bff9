//! Supervisor node (§4.3): turns the raw prompt into a golden specification
//! and extracted constraints.

use crate::model::Constraints;
use crate::parsing::extract_json_object;
use crate::state::{self, FIELD_EVENTS};
use async_trait::async_trait;
use conclave_collab::{LlmAdapter, Message, VaultIndexer};
use conclave_core::NodeExecutor;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct SupervisorNode {
    pub llm: Arc<dyn LlmAdapter>,
    pub vault: Arc<dyn VaultIndexer>,
}

/// Parses the supervisor's reply, falling back to using the raw reply as
/// the specification with empty constraints on parse failure (§4.3's
/// contract: never fatal).
pub fn parse_supervisor_reply(reply: &str) -> (String, Constraints) {
    match extract_json_object(reply) {
        Some(value) => {
            let specification = value
                .get("specification")
                .and_then(Value::as_str)
                .unwrap_or(reply)
                .to_string();
            let constraints: Constraints = serde_json::from_value(value).unwrap_or_default();
            (specification, constraints)
        }
        None => (reply.to_string(), Constraints::default()),
    }
}

#[async_trait]
impl NodeExecutor for SupervisorNode {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        let mut design = state::read_design(state);
        let config = state::read_config(state);

        let system = "You are a CAD design supervisor. Respond with a JSON object containing \
                       `specification`, `key_constraints`, `critical_dimensions`, and `manufacturing_notes`.";
        let kb_context = match self.vault.search(&design.prompt, 3).await {
            Ok(results) if !results.is_empty() => serde_json::to_string_pretty(&results).ok(),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(design_id = %design.id, error = %e, "vault search failed, continuing without kb_context");
                None
            }
        };
        let prompt = match &kb_context {
            Some(context) => format!("Design request: {}\n\nRelated prior designs from the vault:\n{context}", design.prompt),
            None => format!("Design request: {}", design.prompt),
        };

        tracing::info!(design_id = %design.id, "supervisor running");
        let response = self.llm.complete(system, &[Message::user(prompt)]).await?;
        let (specification, constraints) = parse_supervisor_reply(&response.content);

        design.specification = specification.clone();
        design.constraints = constraints.clone();
        design.status = crate::model::DesignStatus::Proposing;

        let mut delta = state::design_delta(design);
        let events = vec![
            json!({"tag": "supervisor:running", "data": {}}),
            json!({
                "tag": "supervisor:completed",
                "data": {
                    "spec_length": specification.len(),
                    "constraint_count": constraints.key_constraints.len(),
                }
            }),
        ];
        delta[FIELD_EVENTS] = Value::Array(events);
        let _ = config;
        Ok(delta)
    }
}
