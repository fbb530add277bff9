//! Wires every node from [`crate::nodes`] into the control flow spec §2
//! describes, including the two dynamic fan-outs (proposals, critiques,
//! fidelity judgments) built here rather than inside the nodes themselves.
//!
//! Critique fan-out deliberately dispatches twice for the judge model: once
//! as one of the ordinary model × valid-proposal critic pairs would *not*
//! include it (the judge isn't a proposal agent), and once explicitly as
//! the "judge-as-critic" pass. §9 documents this as an intentional,
//! preserved duplication rather than a bug to quietly collapse.

use crate::model::Proposal;
use crate::nodes::{
    CollectCritiquesNode, CollectFidelityNode, CollectProposalsNode, CritiqueWorkerNode, FidelityWorkerNode,
    FinalizeFailedNode, FinalizeSuccessNode, HumanApprovalNode, LearnerNode, MergerNode, PrepareRoundNode,
    ProposalWorkerNode, SandboxEvaluatorNode, SupervisorNode, VaultIndexNode,
};
use crate::state;
use conclave_collab::{Analyzer, LlmAdapter, Sandbox, ToolCallingLlmAdapter, VaultIndexer};
use conclave_core::{ConditionalEdgeResult, Graph, Result, Send, END, START};
use serde_json::{json, Value};
use std::sync::Arc;

/// Every external collaborator a compiled graph needs. One instance is
/// shared across all of a run's fan-out dispatches.
pub struct Collaborators {
    pub supervisor_llm: Arc<dyn LlmAdapter>,
    pub proposal_llm: Arc<dyn ToolCallingLlmAdapter>,
    pub critic_llm: Arc<dyn LlmAdapter>,
    pub judge_llm: Arc<dyn LlmAdapter>,
    pub merger_llm: Arc<dyn LlmAdapter>,
    pub learner_llm: Arc<dyn LlmAdapter>,
    pub sandbox: Arc<dyn Sandbox>,
    pub analyzer: Arc<dyn Analyzer>,
    pub vault: Arc<dyn VaultIndexer>,
}

fn with_overlay(state: &Value, overlay: Value) -> Value {
    let mut merged = state.clone();
    if let (Some(target), Some(source)) = (merged.as_object_mut(), overlay.as_object()) {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
    merged
}

fn valid_proposals_in_current_round(state: &Value) -> Vec<Proposal> {
    let design = state::read_design(state);
    design
        .rounds
        .last()
        .map(|round| round.proposals.iter().filter(|p| p.is_valid()).cloned().collect())
        .unwrap_or_default()
}

fn build_proposal_sends(state: &Value) -> ConditionalEdgeResult {
    let config = state::read_config(state);
    let sends = config
        .proposal_agents
        .iter()
        .map(|agent| Send::new("proposal_worker", with_overlay(state, json!({"worker_model": agent.model}))))
        .collect();
    ConditionalEdgeResult::Sends(sends)
}

/// Builds the N×N-excluding-self critique dispatches plus one judge-as-critic
/// pass per valid proposal (§4.8, §9).
fn build_critique_sends(state: &Value) -> ConditionalEdgeResult {
    let config = state::read_config(state);
    let valid = valid_proposals_in_current_round(state);
    let mut sends = Vec::new();

    for proposal in &valid {
        for agent in &config.proposal_agents {
            if agent.model != proposal.model {
                let overlay = json!({
                    "critic_model": agent.model,
                    "worker_target": proposal.id,
                    "target_code": proposal.code,
                });
                sends.push(Send::new("critique_worker", with_overlay(state, overlay)));
            }
        }
        let judge_overlay = json!({
            "critic_model": config.judge_model,
            "worker_target": proposal.id,
            "target_code": proposal.code,
        });
        sends.push(Send::new("critique_worker", with_overlay(state, judge_overlay)));
    }
    ConditionalEdgeResult::Sends(sends)
}

fn build_fidelity_sends(state: &Value) -> ConditionalEdgeResult {
    let valid = valid_proposals_in_current_round(state);
    let sends = valid
        .iter()
        .map(|proposal| Send::new("fidelity_worker", with_overlay(state, json!({"worker_target": proposal.id}))))
        .collect();
    ConditionalEdgeResult::Sends(sends)
}

/// The edge leaving `sandbox_evaluator`: decides the branch via
/// [`crate::nodes::sandbox::route_after_sandbox`], then builds the matching
/// fan-out's `Send` list.
fn route_after_sandbox_dispatch(state: &Value) -> ConditionalEdgeResult {
    match crate::nodes::sandbox::route_after_sandbox(state) {
        "fan_out_critiques" => build_critique_sends(state),
        _ => build_fidelity_sends(state),
    }
}

/// Builds the compiled graph (spec §2's control flow):
///
/// ```text
/// supervisor -> prepare_round -> [proposal_worker]* -> collect_proposals
///   -> (sandbox_evaluator | finalize_failed)
/// sandbox_evaluator -> ([critique_worker]* -> collect_critiques | [fidelity_worker]*)
/// collect_critiques -> [fidelity_worker]* -> collect_fidelity -> merger
/// merger -> (human_approval | learner | prepare_round | finalize_failed)
/// human_approval -> (learner | finalize_failed)
/// learner -> vault_index -> finalize_success -> END
/// finalize_failed -> END
/// ```
pub fn build_graph(collab: Collaborators) -> Result<conclave_core::CompiledGraph> {
    let mut graph = Graph::new();

    graph.add_node("supervisor", SupervisorNode { llm: collab.supervisor_llm, vault: collab.vault.clone() })?;
    graph.add_node("prepare_round", PrepareRoundNode)?;
    graph.add_node(
        "proposal_worker",
        ProposalWorkerNode { llm: collab.proposal_llm, sandbox: collab.sandbox.clone(), vault: collab.vault.clone() },
    )?;
    graph.add_node("collect_proposals", CollectProposalsNode)?;
    graph.add_node("sandbox_evaluator", SandboxEvaluatorNode { sandbox: collab.sandbox.clone(), analyzer: collab.analyzer })?;
    graph.add_node("critique_worker", CritiqueWorkerNode { llm: collab.critic_llm })?;
    graph.add_node("collect_critiques", CollectCritiquesNode)?;
    graph.add_node("fidelity_worker", FidelityWorkerNode { llm: collab.judge_llm })?;
    graph.add_node("collect_fidelity", CollectFidelityNode)?;
    graph.add_node("merger", MergerNode { llm: collab.merger_llm })?;
    graph.add_node("human_approval", HumanApprovalNode)?;
    graph.add_node("learner", LearnerNode { llm: collab.learner_llm })?;
    graph.add_node("vault_index", VaultIndexNode { indexer: collab.vault })?;
    graph.add_node("finalize_success", FinalizeSuccessNode)?;
    graph.add_node("finalize_failed", FinalizeFailedNode)?;

    graph.add_edge(START, "supervisor");
    graph.add_edge("supervisor", "prepare_round");
    graph.add_conditional_edge("prepare_round", build_proposal_sends);
    graph.add_edge("proposal_worker", "collect_proposals");
    graph.add_conditional_edge("collect_proposals", |state| crate::nodes::collect::route_after_collect(state).into());
    graph.add_conditional_edge("sandbox_evaluator", route_after_sandbox_dispatch);
    graph.add_edge("critique_worker", "collect_critiques");
    graph.add_conditional_edge("collect_critiques", build_fidelity_sends);
    graph.add_edge("fidelity_worker", "collect_fidelity");
    graph.add_edge("collect_fidelity", "merger");
    graph.add_conditional_edge("merger", |state| crate::nodes::merge::route_after_merge(state).into());
    graph.add_conditional_edge("human_approval", |state| crate::nodes::approval::route_after_approval(state).into());
    graph.add_edge("learner", "vault_index");
    graph.add_edge("vault_index", "finalize_success");
    graph.add_edge("finalize_success", END);
    graph.add_edge("finalize_failed", END);

    graph.compile()
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_collab::{MockAnalyzer, MockLlmAdapter, MockSandbox, MockToolCallingLlmAdapter, NullVaultIndexer};

    fn mock_collaborators() -> Collaborators {
        Collaborators {
            supervisor_llm: Arc::new(MockLlmAdapter::new([r#"{"specification": "a 50mm cube", "key_constraints": [], "critical_dimensions": {}, "manufacturing_notes": []}"#])),
            proposal_llm: Arc::new(MockToolCallingLlmAdapter::single_submission("fn build() {}")),
            critic_llm: Arc::new(MockLlmAdapter::new(Vec::<String>::new())),
            judge_llm: Arc::new(MockLlmAdapter::new([r#"{"llm_score": 90, "text_similarity": 90, "geometric_accuracy": 90, "manufacturing_viability": 90, "reasoning": "good"}"#])),
            merger_llm: Arc::new(MockLlmAdapter::unavailable()),
            learner_llm: Arc::new(MockLlmAdapter::new([r#"{"pattern": "simple cube", "notes": "ok"}"#])),
            sandbox: Arc::new(MockSandbox::succeeding("out/part.stl")),
            analyzer: Arc::new(MockAnalyzer::clean((50.0, 50.0, 50.0))),
            vault: Arc::new(NullVaultIndexer),
        }
    }

    #[test]
    fn compiles_with_every_node_reachable() {
        assert!(build_graph(mock_collaborators()).is_ok());
    }
}
