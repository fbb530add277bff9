//! Fidelity fan-out worker and collector (§4.9): blends the deterministic
//! algorithmic score ([`crate::scoring`]) with a judge model's qualitative
//! read.

use crate::model::{FidelityScore, ScoreSnapshot};
use crate::parsing::extract_json_object;
use crate::scoring::algorithmic_score;
use crate::state::{self, FIELD_EVENTS, FIELD_FIDELITY_CONSUMED, FIELD_FIDELITY_RESULTS, FIELD_SCORE_HISTORY};
use async_trait::async_trait;
use conclave_collab::{LlmAdapter, Message};
use conclave_core::NodeExecutor;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct FidelityWorkerNode {
    pub llm: Arc<dyn LlmAdapter>,
}

struct JudgeReply {
    llm_score: f64,
    text_similarity: f64,
    geometric_accuracy: f64,
    manufacturing_viability: f64,
    reasoning: String,
}

fn parse_judge_reply(reply: &str) -> JudgeReply {
    let num = |value: &Value, key: &str| value.get(key).and_then(Value::as_f64).unwrap_or(0.0);
    match extract_json_object(reply) {
        Some(value) => JudgeReply {
            llm_score: num(&value, "llm_score"),
            text_similarity: num(&value, "text_similarity"),
            geometric_accuracy: num(&value, "geometric_accuracy"),
            manufacturing_viability: num(&value, "manufacturing_viability"),
            reasoning: value.get("reasoning").and_then(Value::as_str).unwrap_or_default().to_string(),
        },
        None => JudgeReply { llm_score: 0.0, text_similarity: 0.0, geometric_accuracy: 0.0, manufacturing_viability: 0.0, reasoning: String::new() },
    }
}

#[async_trait]
impl NodeExecutor for FidelityWorkerNode {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        let design = state::read_design(state);
        let config = state::read_config(state);
        let proposal_id: crate::ids::ProposalId = serde_json::from_value(state["worker_target"].clone())?;

        let round = design.rounds.last().expect("fidelity worker runs within a round");
        let proposal = round
            .proposals
            .iter()
            .find(|p| p.id == proposal_id)
            .expect("fidelity worker dispatched only for proposals in the current round");
        let eval = proposal.sandbox_eval.clone().unwrap_or_default();

        let algorithmic = algorithmic_score(&eval, &design.constraints.critical_dimensions);

        let system = "You are a design fidelity judge. Respond with a JSON object containing \
                       `llm_score`, `text_similarity`, `geometric_accuracy`, `manufacturing_viability` \
                       (each 0-100), and `reasoning`.";
        let prompt = format!(
            "Specification:\n{}\n\nCode:\n{}\n\nAlgorithmic sub-score: {:.1}",
            design.specification, proposal.code, algorithmic
        );
        let response = self.llm.complete(system, &[Message::user(prompt)]).await?;
        let judged = parse_judge_reply(&response.content);

        let blended = FidelityScore::blend(algorithmic, judged.llm_score);
        let score = FidelityScore {
            proposal_id: proposal_id.clone(),
            algorithmic_score: algorithmic,
            llm_score: judged.llm_score,
            blended_score: blended,
            text_similarity: judged.text_similarity,
            geometric_accuracy: judged.geometric_accuracy,
            manufacturing_viability: judged.manufacturing_viability,
            reasoning: judged.reasoning,
            passed: blended >= config.fidelity_threshold,
        };

        Ok(json!({
            FIELD_FIDELITY_RESULTS: [score.clone()],
            FIELD_EVENTS: [{"tag": "fidelity:settled", "data": {"proposal_id": proposal_id.0, "blended_score": blended, "passed": score.passed}}],
        }))
    }
}

pub struct CollectFidelityNode;

#[async_trait]
impl NodeExecutor for CollectFidelityNode {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        let all_scores = state::read_fidelity_results(state);
        let consumed = state::read_usize_field(state, FIELD_FIDELITY_CONSUMED);
        let new_scores = all_scores[consumed..].to_vec();

        let mut design = state::read_design(state);
        let round_idx = design.rounds.len() - 1;
        for score in &new_scores {
            if let Some(proposal) = design.rounds[round_idx].proposals.iter_mut().find(|p| p.id == score.proposal_id) {
                proposal.fidelity = Some(score.clone());
            }
        }

        let mut delta = state::design_delta(design);
        delta[FIELD_FIDELITY_CONSUMED] = json!(all_scores.len());
        delta[FIELD_SCORE_HISTORY] = json!([ScoreSnapshot { round: state::read_current_round(state), scores: new_scores.clone() }]);
        delta[FIELD_EVENTS] = json!([]);
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_judge_reply() {
        let reply = r#"{"llm_score": 88, "text_similarity": 90, "geometric_accuracy": 85, "manufacturing_viability": 80, "reasoning": "close match"}"#;
        let judged = parse_judge_reply(reply);
        assert_eq!(judged.llm_score, 88.0);
        assert_eq!(judged.reasoning, "close match");
    }

    #[test]
    fn malformed_reply_defaults_to_zero() {
        let judged = parse_judge_reply("not json");
        assert_eq!(judged.llm_score, 0.0);
    }
}
