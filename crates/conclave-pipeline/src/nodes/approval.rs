//! Human-approval node (§4.12): an interrupt point. Skipped entirely when
//! `human_approval_required` is false (the merger routes straight to the
//! learner in that case — see [`crate::nodes::merge::route_after_merge`]).

use crate::model::DesignStatus;
use crate::state::{self, FIELD_EVENTS};
use async_trait::async_trait;
use conclave_core::{NodeExecutor, INTERRUPT_KEY, RESUME_REPLY_KEY};
use serde_json::{json, Value};

pub struct HumanApprovalNode;

#[async_trait]
impl NodeExecutor for HumanApprovalNode {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        if let Some(reply) = state.get(RESUME_REPLY_KEY) {
            let approved = reply.get("approved").and_then(Value::as_bool).unwrap_or(false);
            let feedback = reply.get("feedback").and_then(Value::as_str).unwrap_or_default().to_string();

            let mut design = state::read_design(state);
            let round_idx = design.rounds.len() - 1;
            design.rounds[round_idx].human_approved = Some(approved);
            design.status = if approved { DesignStatus::Learning } else { DesignStatus::Failed };

            let mut delta = state::design_delta(design);
            if !approved {
                delta[crate::state::FIELD_TERMINAL_REASON] = json!(format!("human rejected: {feedback}"));
            }
            delta[FIELD_EVENTS] = json!([{"tag": "approval:response", "data": {"approved": approved, "feedback": feedback}}]);
            return Ok(delta);
        }

        let design = state::read_design(state);
        let winner_id = design.rounds.last().and_then(|r| r.winner_id.clone());
        Ok(json!({
            FIELD_EVENTS: [{"tag": "approval:requested", "data": {"winner_id": winner_id.map(|id| id.0)}}],
            INTERRUPT_KEY: {"kind": "human_approval", "winner_id": design.rounds.last().and_then(|r| r.winner_id.clone()).map(|id| id.0)},
        }))
    }
}

/// Routes after a resolved approval: `learner` on approval, `finalize_failed`
/// on rejection (§4.12, §7.7).
pub fn route_after_approval(state: &Value) -> &'static str {
    let design = state::read_design(state);
    match design.rounds.last().and_then(|r| r.human_approved) {
        Some(true) => "learner",
        _ => "finalize_failed",
    }
}
