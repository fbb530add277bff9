//! The [`CheckpointSaver`] trait: per-thread, per-step state snapshots.
//!
//! A checkpoint pairs a graph execution's full state with the step index it
//! was taken at and, when the graph is currently suspended, the node and
//! payload it is waiting on. Checkpoints are append-only from the backend's
//! point of view: callers only ever ask for the *latest* one, never for an
//! explicit version, which keeps swapping the backend (in-memory today, a
//! durable store tomorrow) an implementation detail behind this trait.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node awaiting an external [`CheckpointSaver`]-mediated resume, and the
/// payload it surfaced when it suspended (e.g. the approval request body).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingInterrupt {
    pub node: String,
    pub payload: Value,
}

/// One (thread, step, state) snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub step: u64,
    pub state: Value,
    pub pending_interrupt: Option<PendingInterrupt>,
}

impl Checkpoint {
    pub fn new(step: u64, state: Value) -> Self {
        Self {
            step,
            state,
            pending_interrupt: None,
        }
    }

    pub fn interrupted(step: u64, state: Value, node: impl Into<String>, payload: Value) -> Self {
        Self {
            step,
            state,
            pending_interrupt: Some(PendingInterrupt {
                node: node.into(),
                payload,
            }),
        }
    }
}

/// Storage backend for checkpoints, keyed by an opaque `thread_id` (one
/// thread per design execution, per the pipeline's single-design-per-thread
/// model).
///
/// Implementations must serialize concurrent `save` calls for the same
/// `thread_id` — the last write for a given step wins, and `load_latest`
/// must never observe a torn write.
#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    /// Persist a checkpoint for `thread_id`. Checkpoints are append-only;
    /// the backend need not retain history beyond the latest.
    async fn save(&self, thread_id: &str, checkpoint: Checkpoint) -> Result<()>;

    /// Load the most recent checkpoint for `thread_id`, if any.
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>>;
}
