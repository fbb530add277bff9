//! Collect-proposals node and the validity gate (§4.6).

use crate::model::DesignStatus;
use crate::state::{self, FIELD_EVENTS, FIELD_PROPOSALS_CONSUMED, FIELD_TERMINAL_REASON};
use async_trait::async_trait;
use conclave_core::NodeExecutor;
use serde_json::{json, Value};

pub struct CollectProposalsNode;

#[async_trait]
impl NodeExecutor for CollectProposalsNode {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        let all_results = state::read_proposal_results(state);
        let consumed = state::read_usize_field(state, FIELD_PROPOSALS_CONSUMED);
        let new_this_round = all_results[consumed..].to_vec();

        let mut design = state::read_design(state);
        let round_idx = design.rounds.len() - 1;
        design.rounds[round_idx].proposals.extend(new_this_round);

        let valid_count = design.rounds[round_idx].proposals.iter().filter(|p| p.is_valid()).count();

        let mut delta = if valid_count == 0 {
            design.status = DesignStatus::Failed;
            state::design_delta(design)
        } else {
            design.status = DesignStatus::Evaluating;
            state::design_delta(design)
        };
        delta[FIELD_PROPOSALS_CONSUMED] = json!(all_results.len());
        if valid_count == 0 {
            delta[FIELD_TERMINAL_REASON] = json!("no valid proposals");
            delta[FIELD_EVENTS] = json!([{"tag": "status:failed", "data": {"reason": "no valid proposals"}}]);
        }
        Ok(delta)
    }
}

/// Routes after `collect_proposals`: `"sandbox"` when there's at least one
/// valid proposal this round, `"__end__"` (by way of `finalize_failed`)
/// otherwise. Exposed separately from the node so `graph_def` can attach it
/// as a conditional edge without re-parsing state.
pub fn route_after_collect(state: &Value) -> &'static str {
    let design = state::read_design(state);
    match design.rounds.last() {
        Some(round) if round.proposals.iter().any(|p| p.is_valid()) => "sandbox_evaluator",
        _ => "finalize_failed",
    }
}
