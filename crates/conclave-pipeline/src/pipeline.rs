//! [`Pipeline`]: the top-level handle `conclave-cli` (and any other
//! embedder) drives. Owns the compiled graph, the checkpointer, and the
//! durable design store, and exposes `run`/`resume` as the two entry
//! points into a design's lifecycle.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::graph_def::{self, Collaborators};
use crate::model::{DesignRecord, PipelineEvent};
use crate::state;
use conclave_checkpoint::CheckpointSaver;
use conclave_core::{CompiledGraph, EventSink, ExecutorConfig, RunOutcome, StreamEvent};
use conclave_store::DesignStore;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub struct Pipeline {
    graph: CompiledGraph,
    store: Arc<dyn DesignStore<DesignRecord>>,
    config: PipelineConfig,
    event_sink: Option<mpsc::UnboundedSender<StreamEvent>>,
}

/// What a completed or interrupted run looks like to the caller. Each
/// variant carries the `events` (§6's event channel tags) the run emitted,
/// so an embedder that didn't wire a live [`EventSink`] can still inspect
/// them after the fact.
pub enum PipelineOutcome {
    Completed(DesignRecord, Vec<PipelineEvent>),
    Failed(DesignRecord, Vec<PipelineEvent>),
    AwaitingApproval { thread_id: String, design: DesignRecord, events: Vec<PipelineEvent> },
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        collaborators: Collaborators,
        checkpointer: Arc<dyn CheckpointSaver>,
        store: Arc<dyn DesignStore<DesignRecord>>,
    ) -> Result<Self> {
        let executor_config = ExecutorConfig {
            max_concurrency: config.max_concurrency,
            node_timeout: Duration::from_secs(config.llm_timeout_secs),
            ..ExecutorConfig::default()
        };
        let graph = graph_def::build_graph(collaborators)?
            .with_checkpointer(checkpointer)
            .with_config(executor_config);
        Ok(Self { graph, store, config, event_sink: None })
    }

    /// Streams every node's emitted events (§6's event channel) over `sink`
    /// as the run progresses, in addition to returning them on the outcome.
    pub fn with_event_sink(mut self, sink: mpsc::UnboundedSender<StreamEvent>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    fn sink(&self) -> EventSink {
        match &self.event_sink {
            Some(tx) => EventSink::new(tx.clone()),
            None => EventSink::null(),
        }
    }

    /// Starts a fresh design from `prompt`, running until it completes,
    /// fails, or hits a human-approval interrupt.
    pub async fn run(&self, prompt: impl Into<String>) -> Result<PipelineOutcome> {
        let design = DesignRecord::new(prompt);
        let thread_id = design.id.0.clone();
        let initial_state = state::initial_state(design, &self.config);
        self.drive(&thread_id, initial_state, false).await
    }

    /// Resumes a design previously suspended at `human_approval`.
    pub async fn resume(&self, thread_id: &str, approved: bool, feedback: Option<String>) -> Result<PipelineOutcome> {
        let reply = serde_json::json!({"approved": approved, "feedback": feedback.unwrap_or_default()});
        let schema = state::schema();
        let outcome = self.graph.resume(thread_id, reply, &schema, self.sink(), CancellationToken::new()).await?;
        self.settle(thread_id, outcome).await
    }

    async fn drive(&self, thread_id: &str, initial_state: Value, _resuming: bool) -> Result<PipelineOutcome> {
        let schema = state::schema();
        let outcome = self.graph.run(thread_id, initial_state, &schema, self.sink(), CancellationToken::new()).await?;
        self.settle(thread_id, outcome).await
    }

    async fn settle(&self, thread_id: &str, outcome: RunOutcome) -> Result<PipelineOutcome> {
        match outcome {
            RunOutcome::Interrupted { state, .. } => {
                let design = state::read_design(&state);
                let events = state::read_events(&state);
                Ok(PipelineOutcome::AwaitingApproval { thread_id: thread_id.to_string(), design, events })
            }
            RunOutcome::Finished { state } => {
                let design = state::read_design(&state);
                let events = state::read_events(&state);
                self.store.save(&design.id.0, &design).await?;
                match design.status {
                    crate::model::DesignStatus::Completed => Ok(PipelineOutcome::Completed(design, events)),
                    crate::model::DesignStatus::Failed => Ok(PipelineOutcome::Failed(design, events)),
                    other => Err(PipelineError::Invariant(format!("run finished with unexpected status {other:?}"))),
                }
            }
        }
    }
}
