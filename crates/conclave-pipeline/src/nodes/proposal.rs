//! Proposal worker (§4.5): a fan-out target, one invocation per configured
//! model per round. Runs a bounded tool-using loop against the LLM,
//! capturing whatever code it submits through the sandbox tool.

use crate::model::{Proposal, ProposalStatus};
use crate::state::{self, FIELD_EVENTS, FIELD_PROPOSAL_RESULTS};
use async_trait::async_trait;
use conclave_collab::{Message, Sandbox, ToolCall, ToolCallingLlmAdapter, VaultIndexer};
use conclave_core::NodeExecutor;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub struct ProposalWorkerNode {
    pub llm: Arc<dyn ToolCallingLlmAdapter>,
    pub sandbox: Arc<dyn Sandbox>,
    pub vault: Arc<dyn VaultIndexer>,
}

/// Vault context is best-effort (§7.3): a search failure just leaves the
/// prompt without it rather than failing the worker.
async fn search_vault_context(vault: &dyn VaultIndexer, query: &str) -> Option<String> {
    match vault.search(query, 3).await {
        Ok(results) if !results.is_empty() => serde_json::to_string_pretty(&results).ok(),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(error = %e, "vault search failed, continuing without kb_context");
            None
        }
    }
}

fn build_prompt(specification: &str, key_constraints: &[String], feedback: &[String], kb_context: Option<&str>) -> String {
    let mut prompt = format!("Specification:\n{specification}\n");
    if !key_constraints.is_empty() {
        prompt.push_str(&format!("\nKey constraints:\n- {}\n", key_constraints.join("\n- ")));
    }
    if !feedback.is_empty() {
        prompt.push_str(&format!("\nFeedback from prior rounds:\n- {}\n", feedback.join("\n- ")));
    }
    if let Some(ctx) = kb_context {
        prompt.push_str(&format!("\nRelevant prior designs:\n{ctx}\n"));
    }
    prompt
}

/// Runs the bounded tool loop, returning the last submitted code (if any)
/// and the artifact path the sandbox produced for it.
async fn run_coder_loop(
    llm: &dyn ToolCallingLlmAdapter,
    sandbox: &dyn Sandbox,
    system: &str,
    prompt: &str,
    max_turns: u32,
) -> anyhow::Result<(String, Option<String>)> {
    let mut messages = vec![Message::user(prompt.to_string())];
    let mut last_code = String::new();
    let mut artifact_path = None;

    for _turn in 0..max_turns {
        let reply = llm.complete_with_tools(system, &messages).await?;
        match reply.tool_call {
            Some(ToolCall::SubmitCode { code }) => {
                let outcome = sandbox.execute(&code, Duration::from_secs(60)).await?;
                last_code = code;
                artifact_path = outcome.artifact_paths.first().cloned();
                messages.push(Message::user(format!(
                    "sandbox result: success={} stdout={}",
                    outcome.success, outcome.stdout
                )));
            }
            None => break,
        }
    }
    Ok((last_code, artifact_path))
}

#[async_trait]
impl NodeExecutor for ProposalWorkerNode {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        let design = state::read_design(state);
        let config = state::read_config(state);
        let model = state["worker_model"].as_str().unwrap_or("unknown-model").to_string();
        let feedback = state::read_accumulated_feedback(state);

        let system = "You are a CAD proposal worker. Submit code through the sandbox tool; \
                       reply with plain text when you are done.";
        let kb_context = search_vault_context(self.vault.as_ref(), &design.specification).await;
        let prompt = build_prompt(&design.specification, &design.constraints.key_constraints, &feedback, kb_context.as_deref());

        let mut proposal = Proposal::new(&model);
        match run_coder_loop(self.llm.as_ref(), self.sandbox.as_ref(), system, &prompt, config.tool_loop_turns).await {
            Ok((code, _artifact_path)) if !code.is_empty() => {
                proposal.code = code;
                proposal.status = ProposalStatus::Completed;
            }
            Ok(_) => {
                proposal.status = ProposalStatus::Failed;
                proposal.reasoning = "model never submitted code".to_string();
            }
            Err(e) => {
                proposal.status = ProposalStatus::Failed;
                proposal.reasoning = format!("worker error: {e}");
            }
        }

        tracing::info!(design_id = %design.id, model = %model, status = ?proposal.status, "proposal worker settled");

        Ok(json!({
            FIELD_PROPOSAL_RESULTS: [proposal.clone()],
            FIELD_EVENTS: [{"tag": "proposal:settled", "data": {"id": proposal.id.0, "model": proposal.model, "status": proposal.status}}],
        }))
    }
}
