//! Prepare-round node (§4.4): advances `current_round` and emits
//! `round:started`. Round-scoped accumulators are not physically cleared
//! (they're append-only audit logs across the whole design, per
//! [`crate::state`]'s design note) — each round's collector instead only
//! drains the slice contributed since it last ran.

use crate::model::{DesignStatus, Round};
use crate::state::{self, FIELD_CURRENT_ROUND, FIELD_EVENTS};
use async_trait::async_trait;
use conclave_core::NodeExecutor;
use serde_json::{json, Value};

pub struct PrepareRoundNode;

#[async_trait]
impl NodeExecutor for PrepareRoundNode {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        let config = state::read_config(state);
        let current_round = state::read_current_round(state) + 1;

        let mut design = state::read_design(state);
        design.rounds.push(Round { round_number: current_round, ..Default::default() });
        design.status = DesignStatus::Proposing;

        let mut delta = state::design_delta(design);
        delta[FIELD_CURRENT_ROUND] = json!(current_round);
        delta[FIELD_EVENTS] = json!([{"tag": "round:started", "data": {"round": current_round, "max_rounds": config.max_rounds}}]);
        Ok(delta)
    }
}
