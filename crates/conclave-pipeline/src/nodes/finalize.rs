//! Terminal nodes (§4.15): stamp the design's final status and emit the
//! closing event. Both route straight to [`conclave_core::END`].

use crate::model::DesignStatus;
use crate::state::{self, FIELD_EVENTS};
use async_trait::async_trait;
use conclave_core::NodeExecutor;
use serde_json::{json, Value};

pub struct FinalizeSuccessNode;

#[async_trait]
impl NodeExecutor for FinalizeSuccessNode {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        let mut design = state::read_design(state);
        let winner_code = state::read_winner_code(state);
        let artifact_path = design
            .rounds
            .last()
            .and_then(|round| round.winner_id.as_ref())
            .and_then(|winner_id| round_winner_artifact(&design, winner_id));

        design.status = DesignStatus::Completed;
        design.final_code = winner_code;
        design.final_artifact_path = artifact_path.clone();

        let summary = format!("Design \"{}\" completed after {} round(s)", design.prompt, design.rounds.len());

        let mut delta = state::design_delta(design);
        delta[FIELD_EVENTS] = json!([
            {"tag": "status:completed", "data": {}},
            {"tag": "completion", "data": {"text": summary, "artifact_path": artifact_path}},
            {"tag": "done", "data": {}},
        ]);
        Ok(delta)
    }
}

fn round_winner_artifact(design: &crate::model::DesignRecord, winner_id: &crate::ids::ProposalId) -> Option<String> {
    design
        .rounds
        .last()?
        .proposals
        .iter()
        .find(|p| &p.id == winner_id)
        .and_then(|p| p.sandbox_eval.as_ref())
        .and_then(|eval| eval.artifact_path.clone())
}

pub struct FinalizeFailedNode;

#[async_trait]
impl NodeExecutor for FinalizeFailedNode {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        let mut design = state::read_design(state);
        design.status = DesignStatus::Failed;

        let reason = state[crate::state::FIELD_TERMINAL_REASON]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| "rounds exhausted without a passing design".to_string());

        let mut delta = state::design_delta(design);
        delta[FIELD_EVENTS] = json!([{"tag": "status:failed", "data": {"reason": reason}}, {"tag": "done", "data": {}}]);
        Ok(delta)
    }
}
