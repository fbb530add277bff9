//! Merger/selector node (§4.10) and post-merger routing (§4.11).
//!
//! With zero passing proposals the round produces no winner. With exactly
//! one, it is the winner outright — no LLM call needed. With two or more,
//! a merger model is asked to either select a single proposal or synthesize
//! a merge; a parse failure falls back to the highest blended score, ties
//! broken by the lexicographically smallest proposal id (§4.9, P7).

use crate::model::{Proposal, ProposalStatus, VersionSummary};
use crate::parsing::extract_json_object;
use crate::state::{
    self, FIELD_ACCUMULATED_FEEDBACK, FIELD_EVENTS, FIELD_PREVIOUS_ARTIFACT_PATH, FIELD_VERSION_HISTORY,
    FIELD_WINNER_CODE, FIELD_WINNER_ID, FIELD_WINNER_MODEL,
};
use async_trait::async_trait;
use conclave_collab::{LlmAdapter, Message};
use conclave_core::NodeExecutor;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct MergerNode {
    pub llm: Arc<dyn LlmAdapter>,
}

enum Decision {
    Select(crate::ids::ProposalId),
    Merge(String),
}

fn parse_merger_reply(reply: &str) -> Option<Decision> {
    let value = extract_json_object(reply)?;
    match value.get("action").and_then(Value::as_str) {
        Some("select") => {
            let id = value.get("proposal_id").and_then(Value::as_str)?;
            Some(Decision::Select(crate::ids::ProposalId::from(id.to_string())))
        }
        Some("merge") => {
            let code = value.get("merged_code").and_then(Value::as_str)?;
            Some(Decision::Merge(code.to_string()))
        }
        _ => None,
    }
}

/// Highest blended score wins; ties broken by the lexicographically
/// smallest proposal id so the outcome is deterministic (P7).
fn highest_scoring<'a>(passing: &'a [&'a Proposal]) -> &'a Proposal {
    passing
        .iter()
        .copied()
        .max_by(|a, b| {
            let sa = a.fidelity.as_ref().map(|f| f.blended_score).unwrap_or(0.0);
            let sb = b.fidelity.as_ref().map(|f| f.blended_score).unwrap_or(0.0);
            sa.partial_cmp(&sb).unwrap().then_with(|| b.id.0.cmp(&a.id.0))
        })
        .expect("highest_scoring called with a non-empty slice")
}

#[async_trait]
impl NodeExecutor for MergerNode {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        let mut design = state::read_design(state);
        let round_idx = design.rounds.len() - 1;
        let current_round = state::read_current_round(state);

        let passing: Vec<&Proposal> = design.rounds[round_idx]
            .proposals
            .iter()
            .filter(|p| p.fidelity.as_ref().map(|f| f.passed).unwrap_or(false))
            .collect();
        let passing_count = passing.len();

        let mut events = vec![json!({"tag": "merger:running", "data": {"passing_count": passing_count}})];
        let scores: Vec<(crate::ids::ProposalId, String, f64)> = design.rounds[round_idx]
            .proposals
            .iter()
            .filter_map(|p| p.fidelity.as_ref().map(|f| (p.id.clone(), p.model.clone(), f.blended_score)))
            .collect();

        // `selected_id` is the proposal (if any) whose own code became the
        // winner outright; a `Decision::Merge` winner is attributed to the
        // highest-scoring proposal for bookkeeping but keeps its own
        // `completed` status rather than becoming `selected` (§4.10, §8 scenario 4).
        let (winner_code, winner_id, winner_model, selected_id) = if passing.is_empty() {
            events.push(json!({"tag": "merger:no_winner", "data": {}}));
            (None, None, None, None)
        } else if passing.len() == 1 {
            let winner = passing[0];
            (Some(winner.code.clone()), Some(winner.id.clone()), Some(winner.model.clone()), Some(winner.id.clone()))
        } else {
            let system = "You are the merger for a competitive design pipeline. Respond with a JSON \
                           object: either {\"action\": \"select\", \"proposal_id\": \"...\"} or \
                           {\"action\": \"merge\", \"merged_code\": \"...\"}.";
            let summary: Vec<Value> = passing
                .iter()
                .map(|p| json!({"id": p.id.0, "model": p.model, "blended_score": p.fidelity.as_ref().map(|f| f.blended_score)}))
                .collect();
            let prompt = format!("Passing proposals:\n{}", serde_json::to_string_pretty(&summary)?);
            let response = self.llm.complete(system, &[Message::user(prompt)]).await?;

            match parse_merger_reply(&response.content) {
                Some(Decision::Select(id)) if passing.iter().any(|p| p.id == id) => {
                    let winner = passing.iter().find(|p| p.id == id).unwrap();
                    (Some(winner.code.clone()), Some(winner.id.clone()), Some(winner.model.clone()), Some(winner.id.clone()))
                }
                Some(Decision::Merge(code)) => {
                    let winner = highest_scoring(&passing);
                    (Some(code), Some(winner.id.clone()), Some(winner.model.clone()), None)
                }
                _ => {
                    let winner = highest_scoring(&passing);
                    (Some(winner.code.clone()), Some(winner.id.clone()), Some(winner.model.clone()), Some(winner.id.clone()))
                }
            }
        };

        // Apply the round's outcome back onto the proposals: the winner (if
        // selected outright) becomes `selected`, every other completed
        // proposal is `rejected` when the round produced no winner at all,
        // with its critiques folded into `accumulated_feedback` for the
        // next round's prompt (§4.10).
        let mut previous_artifact_path = None;
        let mut new_feedback: Vec<String> = Vec::new();
        for proposal in design.rounds[round_idx].proposals.iter_mut() {
            if winner_id.as_ref() == Some(&proposal.id) {
                previous_artifact_path = proposal.sandbox_eval.as_ref().and_then(|eval| eval.artifact_path.clone());
            }
            if selected_id.as_ref() == Some(&proposal.id) {
                proposal.status = ProposalStatus::Selected;
            } else if winner_id.is_none() && proposal.status == ProposalStatus::Completed {
                new_feedback.extend(proposal.critiques_received.iter().flat_map(|c| c.weaknesses.iter().cloned()));
                if let Some(fidelity) = &proposal.fidelity {
                    if !fidelity.reasoning.is_empty() {
                        new_feedback.push(fidelity.reasoning.clone());
                    }
                }
                proposal.status = ProposalStatus::Rejected;
            }
        }

        design.rounds[round_idx].winner_id = winner_id.clone();
        design.rounds[round_idx].merged_code = winner_code.clone();
        design.version_history.push(VersionSummary {
            round: current_round,
            proposal_count: design.rounds[round_idx].proposals.len(),
            passing_count,
            winner_id: winner_id.clone(),
            scores,
        });
        events.push(json!({"tag": "merger:completed", "data": {"winner_id": winner_id.as_ref().map(|id| id.0.clone())}}));

        let mut delta = state::design_delta(design);
        delta[FIELD_WINNER_CODE] = json!(winner_code);
        delta[FIELD_WINNER_ID] = json!(winner_id);
        delta[FIELD_WINNER_MODEL] = json!(winner_model);
        delta[FIELD_VERSION_HISTORY] = json!([]);
        delta[FIELD_EVENTS] = json!(events);
        delta[FIELD_PREVIOUS_ARTIFACT_PATH] = json!(previous_artifact_path);
        delta[FIELD_ACCUMULATED_FEEDBACK] = json!(new_feedback);
        Ok(delta)
    }
}

/// Routes after the merger (§4.11): a non-empty winner advances to
/// human-approval (if configured) or straight to the learner; an empty
/// winner retries another round unless the round budget is exhausted.
pub fn route_after_merge(state: &Value) -> &'static str {
    let config = state::read_config(state);
    let has_winner = state::read_winner_code(state).is_some();
    if has_winner {
        if config.human_approval_required {
            "human_approval"
        } else {
            "learner"
        }
    } else if state::read_current_round(state) >= config.max_rounds {
        "finalize_failed"
    } else {
        "prepare_round"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::model::{DesignRecord, FidelityScore, Proposal, ProposalStatus, Round};
    use conclave_collab::MockLlmAdapter;

    fn passing_proposal(model: &str, score: f64) -> Proposal {
        let mut p = Proposal::new(model);
        p.status = ProposalStatus::Completed;
        p.code = format!("fn build_{model}() {{}}");
        p.fidelity = Some(FidelityScore { blended_score: score, passed: true, ..Default::default() });
        p.sandbox_eval = Some(crate::model::SandboxEval {
            execution_success: true,
            artifact_path: Some(format!("out/{model}.stl")),
            ..Default::default()
        });
        p
    }

    fn state_with_round(proposals: Vec<Proposal>) -> Value {
        let mut design = DesignRecord::new("a bracket");
        design.rounds.push(Round { round_number: 1, proposals, ..Default::default() });
        let config = PipelineConfig::minimal_for_test(vec!["worker-a"]);
        let mut state = state::initial_state(design, &config);
        state[crate::state::FIELD_CURRENT_ROUND] = json!(1);
        state
    }

    fn events_of(delta: &Value) -> Vec<String> {
        delta[FIELD_EVENTS].as_array().unwrap().iter().map(|e| e["tag"].as_str().unwrap().to_string()).collect()
    }

    #[tokio::test]
    async fn single_passing_proposal_wins_without_an_llm_call() {
        let state = state_with_round(vec![passing_proposal("worker-a", 96.0)]);
        let node = MergerNode { llm: Arc::new(MockLlmAdapter::unavailable()) };
        let delta = node.execute(&state).await.unwrap();
        assert!(delta[FIELD_WINNER_CODE].as_str().is_some());
        assert_eq!(delta[FIELD_WINNER_MODEL], json!("worker-a"));
        assert_eq!(delta[FIELD_PREVIOUS_ARTIFACT_PATH], json!("out/worker-a.stl"));
        assert_eq!(events_of(&delta), vec!["merger:running", "merger:completed"]);

        let design = state::read_design(&delta);
        assert_eq!(design.rounds[0].proposals[0].status, ProposalStatus::Selected);
    }

    #[tokio::test]
    async fn no_passing_proposals_leaves_no_winner() {
        let mut failing = Proposal::new("worker-a");
        failing.status = ProposalStatus::Completed;
        failing.code = "fn build() {}".into();
        failing.fidelity = Some(FidelityScore { blended_score: 40.0, passed: false, reasoning: "too thin".into(), ..Default::default() });
        failing.critiques_received.push(crate::model::Critique {
            critic_model: "worker-b".into(),
            target_proposal_id: failing.id.clone(),
            weaknesses: vec!["walls collapse under load".into()],
            ..Default::default()
        });
        let state = state_with_round(vec![failing]);
        let node = MergerNode { llm: Arc::new(MockLlmAdapter::unavailable()) };
        let delta = node.execute(&state).await.unwrap();
        assert!(delta[FIELD_WINNER_CODE].is_null());
        assert!(delta[FIELD_PREVIOUS_ARTIFACT_PATH].is_null());
        assert_eq!(route_after_merge(&delta), "prepare_round");
        assert_eq!(events_of(&delta), vec!["merger:running", "merger:no_winner", "merger:completed"]);

        let design = state::read_design(&delta);
        assert_eq!(design.rounds[0].proposals[0].status, ProposalStatus::Rejected);

        let feedback: Vec<String> = serde_json::from_value(delta[FIELD_ACCUMULATED_FEEDBACK].clone()).unwrap();
        assert!(feedback.contains(&"walls collapse under load".to_string()));
        assert!(feedback.contains(&"too thin".to_string()));
    }

    #[tokio::test]
    async fn two_passing_proposals_fall_back_to_highest_score_on_parse_failure() {
        let state = state_with_round(vec![passing_proposal("worker-a", 80.0), passing_proposal("worker-b", 95.0)]);
        let node = MergerNode { llm: Arc::new(MockLlmAdapter::new(vec!["not json".into()])) };
        let delta = node.execute(&state).await.unwrap();
        assert_eq!(delta[FIELD_WINNER_MODEL], json!("worker-b"));

        let design = state::read_design(&delta);
        let winner = design.rounds[0].proposals.iter().find(|p| p.model == "worker-b").unwrap();
        let loser = design.rounds[0].proposals.iter().find(|p| p.model == "worker-a").unwrap();
        assert_eq!(winner.status, ProposalStatus::Selected);
        assert_eq!(loser.status, ProposalStatus::Completed);
    }

    #[tokio::test]
    async fn merge_decision_keeps_the_contributing_proposal_completed() {
        let state = state_with_round(vec![passing_proposal("worker-a", 80.0), passing_proposal("worker-b", 95.0)]);
        let reply = json!({"action": "merge", "merged_code": "fn build_merged() {}"}).to_string();
        let node = MergerNode { llm: Arc::new(MockLlmAdapter::new(vec![reply])) };
        let delta = node.execute(&state).await.unwrap();
        assert_eq!(delta[FIELD_WINNER_CODE], json!("fn build_merged() {}"));
        assert_eq!(delta[FIELD_WINNER_MODEL], json!("worker-b"));

        let design = state::read_design(&delta);
        let contributing = design.rounds[0].proposals.iter().find(|p| p.model == "worker-b").unwrap();
        let other = design.rounds[0].proposals.iter().find(|p| p.model == "worker-a").unwrap();
        assert_eq!(contributing.status, ProposalStatus::Completed);
        assert_eq!(other.status, ProposalStatus::Completed);
    }

    #[test]
    fn route_terminates_when_rounds_are_exhausted() {
        let mut state = state_with_round(vec![]);
        state[crate::state::FIELD_CURRENT_ROUND] = json!(3);
        assert_eq!(route_after_merge(&state), "finalize_failed");
    }
}
