//! Critique fan-out worker and collector (§4.8). The fan-out itself (model
//! × valid-proposal pairs excluding self-critique, plus one judge-as-critic
//! pass per valid proposal — §9's documented, preserved duplication) is
//! built by [`crate::graph_def`]; this module only implements what runs at
//! each dispatched node.

use crate::model::Critique;
use crate::parsing::extract_json_object;
use crate::state::{self, FIELD_CRITIQUES, FIELD_CRITIQUES_CONSUMED, FIELD_EVENTS};
use async_trait::async_trait;
use conclave_collab::{LlmAdapter, Message};
use conclave_core::NodeExecutor;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct CritiqueWorkerNode {
    pub llm: Arc<dyn LlmAdapter>,
}

/// Parses a critique reply's sub-lists; missing/malformed fields default to
/// empty rather than failing the worker (§7.2).
pub fn parse_critique_reply(reply: &str) -> (Vec<String>, Vec<String>, Vec<String>, Vec<String>) {
    let value = match extract_json_object(reply) {
        Some(v) => v,
        None => return (Vec::new(), Vec::new(), Vec::new(), Vec::new()),
    };
    let list = |key: &str| -> Vec<String> {
        value
            .get(key)
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    };
    (list("strengths"), list("weaknesses"), list("suggested_fixes"), list("fidelity_concerns"))
}

#[async_trait]
impl NodeExecutor for CritiqueWorkerNode {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        let critic_model = state["critic_model"].as_str().unwrap_or("unknown-critic").to_string();
        let target_proposal_id: crate::ids::ProposalId = serde_json::from_value(state["worker_target"].clone())?;
        let target_code = state["target_code"].as_str().unwrap_or_default().to_string();
        let design = state::read_design(state);

        let system = "You are a design critic. Respond with a JSON object containing `strengths`, \
                       `weaknesses`, `suggested_fixes`, and `fidelity_concerns`, each a list of short strings.";
        let prompt = format!("Specification:\n{}\n\nProposal code:\n{}", design.specification, target_code);
        let response = self.llm.complete(system, &[Message::user(prompt)]).await?;
        let (strengths, weaknesses, suggested_fixes, fidelity_concerns) = parse_critique_reply(&response.content);

        let critique = Critique {
            critic_model: critic_model.clone(),
            target_proposal_id: target_proposal_id.clone(),
            strengths,
            weaknesses,
            suggested_fixes,
            fidelity_concerns,
        };

        Ok(json!({
            FIELD_CRITIQUES: [critique],
            FIELD_EVENTS: [{"tag": "debate:running", "data": {"critic": critic_model, "target": target_proposal_id.0}}],
        }))
    }
}

pub struct CollectCritiquesNode;

#[async_trait]
impl NodeExecutor for CollectCritiquesNode {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        let all_critiques = state::read_critiques(state);
        let consumed = state::read_usize_field(state, FIELD_CRITIQUES_CONSUMED);
        let new_critiques = &all_critiques[consumed..];

        let mut design = state::read_design(state);
        let round_idx = design.rounds.len() - 1;
        for critique in new_critiques {
            if let Some(proposal) = design.rounds[round_idx]
                .proposals
                .iter_mut()
                .find(|p| p.id == critique.target_proposal_id)
            {
                proposal.critiques_received.push(critique.clone());
            }
        }

        let mut delta = state::design_delta(design);
        delta[FIELD_CRITIQUES_CONSUMED] = json!(all_critiques.len());
        delta[FIELD_EVENTS] = json!([{"tag": "debate:completed", "data": {"count": new_critiques.len()}}]);
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_four_critique_fields() {
        let reply = r#"{
            "strengths": ["clean geometry"],
            "weaknesses": ["wall too thin"],
            "suggested_fixes": ["increase wall to 2mm"],
            "fidelity_concerns": ["hole diameter off by 10%"]
        }"#;
        let (s, w, f, c) = parse_critique_reply(reply);
        assert_eq!(s, vec!["clean geometry".to_string()]);
        assert_eq!(w, vec!["wall too thin".to_string()]);
        assert_eq!(f, vec!["increase wall to 2mm".to_string()]);
        assert_eq!(c, vec!["hole diameter off by 10%".to_string()]);
    }

    #[test]
    fn unparseable_reply_defaults_to_empty_lists() {
        let (s, w, f, c) = parse_critique_reply("not json");
        assert!(s.is_empty() && w.is_empty() && f.is_empty() && c.is_empty());
    }
}
