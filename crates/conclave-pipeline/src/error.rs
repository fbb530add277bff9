//! Errors produced while running the competitive design pipeline.
//!
//! Per §7, most failure kinds are absorbed locally (a failed proposal, a
//! degraded fidelity score, a non-fatal collaborator error) and never reach
//! this enum. What's left are the terminal and fatal kinds: round-budget
//! exhaustion, human rejection, and executor invariant violations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// §7.4: every proposal in a round failed.
    #[error("no valid proposals in round {round}")]
    NoValidProposals { round: u32 },

    /// §7.5: no winner after exhausting the round budget.
    #[error("round budget exhausted: {rounds_run} rounds, threshold {threshold}")]
    RoundsExhausted { rounds_run: u32, threshold: f64 },

    /// §7.7: human rejected the winning proposal.
    #[error("human rejected the winning proposal: {feedback}")]
    HumanRejected { feedback: String },

    /// §7.6: a structural problem with the graph or its checkpoints, not
    /// recoverable by retrying.
    #[error("pipeline invariant violated: {0}")]
    Invariant(String),

    #[error("graph execution error: {0}")]
    Graph(#[from] conclave_core::GraphError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] conclave_checkpoint::CheckpointError),

    #[error("design store error: {0}")]
    Store(#[from] conclave_store::StoreError),

    #[error("collaborator error: {0}")]
    Collab(#[from] conclave_collab::CollabError),

    #[error("configuration error: {0}")]
    Config(String),
}
