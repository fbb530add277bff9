//! Sandbox evaluator node (§4.7): sequential (not parallel) pass over the
//! round's valid proposals, invoking the sandbox and, on success, the
//! analyzer collaborator. Writes the resulting [`SandboxEval`] onto each
//! proposal in place.

use crate::model::SandboxEval;
use crate::state::{self, FIELD_EVENTS};
use async_trait::async_trait;
use conclave_collab::{Analyzer, Sandbox};
use conclave_core::NodeExecutor;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub struct SandboxEvaluatorNode {
    pub sandbox: Arc<dyn Sandbox>,
    pub analyzer: Arc<dyn Analyzer>,
}

#[async_trait]
impl NodeExecutor for SandboxEvaluatorNode {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        let mut design = state::read_design(state);
        let round_idx = design.rounds.len() - 1;
        let previous_artifact_path = state[crate::state::FIELD_PREVIOUS_ARTIFACT_PATH].as_str().map(str::to_string);
        let mut events = Vec::new();

        let proposal_ids: Vec<usize> = design.rounds[round_idx]
            .proposals
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_valid())
            .map(|(i, _)| i)
            .collect();

        for idx in proposal_ids {
            let proposal = &design.rounds[round_idx].proposals[idx];
            events.push(json!({"tag": "sandbox:running", "data": {"id": proposal.id.0}}));

            let outcome = self.sandbox.execute(&proposal.code, Duration::from_secs(60)).await?;
            let mut eval = SandboxEval {
                execution_success: outcome.success,
                execution_error: if outcome.success { None } else { Some(outcome.stderr.clone()) },
                artifact_path: outcome.artifact_paths.first().cloned(),
                image_paths: Vec::new(),
                ..Default::default()
            };

            if outcome.success {
                if let Some(artifact_path) = eval.artifact_path.clone() {
                    let report = self.analyzer.analyze(&artifact_path).await?;
                    eval.is_watertight = report.watertight;
                    eval.volume_cm3 = report.volume_cm3;
                    eval.bounding_box_cm = report.bounding_box_cm;
                    eval.dfm_issues = report.dfm_issues;
                    eval.risk_level = Some(match report.fea_risk {
                        conclave_collab::RiskLevel::Low => crate::model::RiskLevel::Low,
                        conclave_collab::RiskLevel::Medium => crate::model::RiskLevel::Medium,
                        conclave_collab::RiskLevel::High => crate::model::RiskLevel::High,
                    });
                    eval.build_volume_violation = report.build_volume_violation;
                    if previous_artifact_path.is_some() {
                        eval.geometric_diff = Some(Default::default());
                    }
                }
            }

            events.push(json!({"tag": "sandbox:completed", "data": {"id": proposal.id.0, "success": eval.execution_success}}));
            design.rounds[round_idx].proposals[idx].sandbox_eval = Some(eval);
        }

        let mut delta = state::design_delta(design);
        delta[FIELD_EVENTS] = json!(events);
        Ok(delta)
    }
}

/// Routes after sandbox evaluation: critique fan-out when debate is
/// enabled and more than one valid proposal exists, fidelity fan-out
/// otherwise (§4.8).
pub fn route_after_sandbox(state: &Value) -> &'static str {
    let design = state::read_design(state);
    let config = state::read_config(state);
    let valid_count = design.rounds.last().map(|r| r.proposals.iter().filter(|p| p.is_valid()).count()).unwrap_or(0);
    if config.debate_enabled && valid_count > 1 {
        "fan_out_critiques"
    } else {
        "fan_out_fidelity"
    }
}
