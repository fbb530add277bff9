//! Errors produced while building or executing a graph.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

/// Failure building, validating, or running a [`crate::graph::Graph`].
#[derive(Error, Debug)]
pub enum GraphError {
    /// A node or edge referenced a node id that was never added.
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// `compile` was called on a graph missing an entry edge from `START`.
    #[error("graph has no entry point: add an edge from START")]
    NoEntryPoint,

    /// A node id was registered twice.
    #[error("node '{0}' is already registered")]
    DuplicateNode(String),

    /// A state field was written with a value the field's reducer rejected.
    #[error("state error on field '{field}': {message}")]
    State { field: String, message: String },

    /// A node executor returned an error while running.
    #[error("node '{node}' failed: {source}")]
    NodeExecution {
        node: String,
        #[source]
        source: anyhow::Error,
    },

    /// A node exceeded its configured execution timeout.
    #[error("node '{node}' timed out after {timeout_secs}s")]
    NodeTimeout { node: String, timeout_secs: u64 },

    /// The run was cancelled via its `CancellationToken` before completing.
    #[error("run on thread '{thread_id}' was cancelled")]
    Cancelled { thread_id: String },

    /// `resume` was called for a thread with no pending interrupt.
    #[error("thread '{thread_id}' is not interrupted")]
    NotInterrupted { thread_id: String },

    /// The executor exceeded its configured superstep limit without reaching `END`.
    #[error("graph exceeded {limit} supersteps without converging on thread '{thread_id}'")]
    StepLimitExceeded { thread_id: String, limit: u64 },

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] conclave_checkpoint::CheckpointError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    pub fn node_execution(node: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::NodeExecution {
            node: node.into(),
            source: source.into(),
        }
    }

    pub fn state(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::State {
            field: field.into(),
            message: message.into(),
        }
    }
}
