//! The superstep loop: the Pregel-style executor that turns a compiled
//! [`crate::graph::Graph`] plus an initial state into a finished or
//! interrupted run, checkpointing after every step.

use crate::error::{GraphError, Result};
use crate::graph::{Graph, END, START};
use crate::send::{ConditionalEdgeResult, Send};
use crate::state::StateSchema;
use crate::stream::{EventSink, StreamEvent};
use conclave_checkpoint::{Checkpoint, CheckpointSaver};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Reserved state key a node returns to suspend the run. The executor
/// strips this key out of the merged state before checkpointing it.
pub const INTERRUPT_KEY: &str = "__interrupt__";

/// Reserved state key [`CompiledGraph::resume`] injects so the previously
/// interrupted node can tell a fresh invocation from a resumed one.
pub const RESUME_REPLY_KEY: &str = "__resume_reply__";

/// Tunables for a single run. Defaults match what a short CLI demo needs;
/// a long-running server should raise `max_concurrency` and `step_limit`.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Upper bound on concurrently-running node tasks within one superstep.
    pub max_concurrency: usize,
    /// Per-node execution timeout.
    pub node_timeout: Duration,
    /// Safety valve against a misrouted graph looping forever.
    pub step_limit: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            node_timeout: Duration::from_secs(300),
            step_limit: 500,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The graph reached [`END`].
    Finished { state: Value },
    /// A node suspended the run; call [`CompiledGraph::resume`] with a
    /// reply to continue.
    Interrupted { state: Value, node: String, payload: Value },
}

/// A validated, immutable [`Graph`] ready to execute.
pub struct CompiledGraph {
    graph: Graph,
    checkpointer: Option<Arc<dyn CheckpointSaver>>,
    config: ExecutorConfig,
}

impl CompiledGraph {
    pub(crate) fn new(graph: Graph) -> Self {
        Self {
            graph,
            checkpointer: None,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn CheckpointSaver>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Starts a fresh run on `thread_id` from `initial_state`.
    pub async fn run(
        &self,
        thread_id: &str,
        initial_state: Value,
        schema: &StateSchema,
        sink: EventSink,
        cancel: CancellationToken,
    ) -> Result<RunOutcome> {
        let frontier = self.graph.route(START, &initial_state)?;
        self.drive(thread_id, 0, initial_state, frontier, schema, sink, cancel).await
    }

    /// Resumes a run previously suspended by an interrupting node, feeding
    /// it `reply` as the external decision it was waiting on.
    pub async fn resume(
        &self,
        thread_id: &str,
        reply: Value,
        schema: &StateSchema,
        sink: EventSink,
        cancel: CancellationToken,
    ) -> Result<RunOutcome> {
        let checkpointer = self
            .checkpointer
            .as_ref()
            .ok_or_else(|| GraphError::NotInterrupted { thread_id: thread_id.to_string() })?;
        let checkpoint = checkpointer
            .load_latest(thread_id)
            .await?
            .ok_or_else(|| GraphError::NotInterrupted { thread_id: thread_id.to_string() })?;
        let pending = checkpoint
            .pending_interrupt
            .ok_or_else(|| GraphError::NotInterrupted { thread_id: thread_id.to_string() })?;

        let mut state = checkpoint.state;
        state
            .as_object_mut()
            .expect("checkpointed state is always an object")
            .insert(RESUME_REPLY_KEY.to_string(), reply);

        let frontier = ConditionalEdgeResult::Node(pending.node);
        self.drive(thread_id, checkpoint.step, state, frontier, schema, sink, cancel).await
    }

    async fn drive(
        &self,
        thread_id: &str,
        mut step: u64,
        mut state: Value,
        mut frontier: ConditionalEdgeResult,
        schema: &StateSchema,
        sink: EventSink,
        cancel: CancellationToken,
    ) -> Result<RunOutcome> {
        loop {
            if cancel.is_cancelled() {
                return Err(GraphError::Cancelled { thread_id: thread_id.to_string() });
            }
            if step >= self.config.step_limit {
                return Err(GraphError::StepLimitExceeded { thread_id: thread_id.to_string(), limit: self.config.step_limit });
            }

            let dispatch = match frontier {
                ConditionalEdgeResult::Node(node) if node == END => {
                    sink.emit(StreamEvent::Finished { step, state: state.clone() });
                    return Ok(RunOutcome::Finished { state });
                }
                ConditionalEdgeResult::Node(node) => vec![Send::new(node, state.clone())],
                ConditionalEdgeResult::Nodes(nodes) => {
                    nodes.into_iter().map(|n| Send::new(n, state.clone())).collect()
                }
                ConditionalEdgeResult::Sends(sends) => sends,
            };

            sink.emit(StreamEvent::SuperstepStarted {
                step,
                nodes: dispatch.iter().map(|s| s.node.clone()).collect(),
            });

            let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
            let mut tasks = Vec::with_capacity(dispatch.len());
            for send in dispatch {
                let Send { node, arg } = send;
                let executor = self
                    .graph
                    .node(&node)
                    .ok_or_else(|| GraphError::UnknownNode(node.clone()))?;
                let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
                let timeout = self.config.node_timeout;
                let node_name = node.clone();
                tasks.push(tokio::spawn(async move {
                    let _permit = permit;
                    let result = tokio::time::timeout(timeout, executor.execute(&arg)).await;
                    (node_name, result)
                }));
            }

            let mut ran_nodes = Vec::with_capacity(tasks.len());
            let mut merged = state.clone();
            let mut interrupt: Option<(String, Value)> = None;

            for task in tasks {
                let (node, result) = task
                    .await
                    .map_err(|e| GraphError::node_execution("join", anyhow::anyhow!(e)))?;
                match result {
                    Ok(Ok(mut update)) => {
                        if let Some(map) = update.as_object_mut() {
                            if let Some(payload) = map.remove(INTERRUPT_KEY) {
                                interrupt = Some((node.clone(), payload));
                            }
                        }
                        merged = schema.apply(&merged, &update)?;
                        sink.emit(StreamEvent::NodeCompleted { step, node: node.clone(), update });
                        ran_nodes.push(node);
                    }
                    Ok(Err(e)) => {
                        sink.emit(StreamEvent::NodeFailed { step, node: node.clone(), error: e.to_string() });
                        return Err(GraphError::node_execution(node, e));
                    }
                    Err(_) => {
                        let timeout_secs = self.config.node_timeout.as_secs();
                        sink.emit(StreamEvent::NodeFailed { step, node: node.clone(), error: "timed out".to_string() });
                        return Err(GraphError::NodeTimeout { node, timeout_secs });
                    }
                }
            }

            if let Some(map) = merged.as_object_mut() {
                map.remove(RESUME_REPLY_KEY);
            }

            if let Some((node, payload)) = interrupt {
                if let Some(checkpointer) = &self.checkpointer {
                    checkpointer
                        .save(thread_id, Checkpoint::interrupted(step, merged.clone(), node.clone(), payload.clone()))
                        .await?;
                }
                sink.emit(StreamEvent::Interrupted { step, node: node.clone(), payload: payload.clone() });
                return Ok(RunOutcome::Interrupted { state: merged, node, payload });
            }

            if let Some(checkpointer) = &self.checkpointer {
                checkpointer.save(thread_id, Checkpoint::new(step, merged.clone())).await?;
                sink.emit(StreamEvent::CheckpointSaved { step });
            }

            let mut next_targets: Vec<ConditionalEdgeResult> = Vec::with_capacity(ran_nodes.len());
            for node in &ran_nodes {
                next_targets.push(self.graph.route(node, &merged)?);
            }

            state = merged;
            step += 1;
            frontier = combine_routes(next_targets);
        }
    }
}

/// Unions the routing decisions of every node that ran this superstep into
/// a single frontier for the next one. `END` only wins outright when it's
/// the sole result; any other node/Send pending alongside it keeps the run
/// going until every branch converges.
fn combine_routes(targets: Vec<ConditionalEdgeResult>) -> ConditionalEdgeResult {
    let mut nodes = Vec::new();
    let mut sends = Vec::new();
    let mut any_non_end = false;

    for target in targets {
        match target {
            ConditionalEdgeResult::Node(n) if n == END => {}
            ConditionalEdgeResult::Node(n) => {
                any_non_end = true;
                nodes.push(n);
            }
            ConditionalEdgeResult::Nodes(ns) => {
                any_non_end = true;
                nodes.extend(ns);
            }
            ConditionalEdgeResult::Sends(ss) => {
                any_non_end = true;
                sends.extend(ss);
            }
        }
    }

    if !any_non_end {
        return ConditionalEdgeResult::Node(END.to_string());
    }
    if sends.is_empty() {
        ConditionalEdgeResult::Nodes(nodes)
    } else {
        sends.extend(nodes.into_iter().map(|n| Send::new(n, Value::Null)));
        ConditionalEdgeResult::Sends(sends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::state::{OverwriteReducer, SumReducer};
    use conclave_checkpoint::InMemoryCheckpointSaver;
    use serde_json::json;

    fn schema() -> StateSchema {
        StateSchema::new()
            .with_default_reducer(OverwriteReducer)
            .add_field("count", SumReducer)
    }

    #[tokio::test]
    async fn runs_a_linear_graph_to_completion() {
        let mut graph = Graph::new();
        graph.add_node("step_one", |s: Value| async move {
            let n = s["count"].as_i64().unwrap_or(0);
            Ok(json!({"count": n + 1}))
        }).unwrap();
        graph.add_edge(START, "step_one");
        graph.add_edge("step_one", END);
        let compiled = graph.compile().unwrap();

        let outcome = compiled
            .run("t1", json!({"count": 0}), &schema(), EventSink::null(), CancellationToken::new())
            .await
            .unwrap();

        match outcome {
            RunOutcome::Finished { state } => assert_eq!(state["count"], json!(1)),
            other => panic!("expected Finished, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fans_out_and_merges_with_sum_reducer() {
        let mut graph = Graph::new();
        graph.add_node("worker", |s: Value| async move {
            Ok(json!({"count": s["n"].as_i64().unwrap_or(1)}))
        }).unwrap();
        graph.add_conditional_edge(START, |_s| {
            crate::send::ConditionalEdgeResult::Sends(vec![
                Send::new("worker", json!({"n": 2})),
                Send::new("worker", json!({"n": 3})),
                Send::new("worker", json!({"n": 4})),
            ])
        });
        graph.add_edge("worker", END);
        let compiled = graph.compile().unwrap();

        let outcome = compiled
            .run("t1", json!({"count": 0}), &schema(), EventSink::null(), CancellationToken::new())
            .await
            .unwrap();

        match outcome {
            RunOutcome::Finished { state } => assert_eq!(state["count"], json!(9)),
            other => panic!("expected Finished, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn interrupts_and_resumes() {
        let mut graph = Graph::new();
        graph.add_node("approval", |s: Value| async move {
            if let Some(reply) = s.get(RESUME_REPLY_KEY) {
                Ok(json!({"approved": reply}))
            } else {
                Ok(json!({ INTERRUPT_KEY: {"question": "approve?"} }))
            }
        }).unwrap();
        graph.add_edge(START, "approval");
        graph.add_edge("approval", END);
        let checkpointer: Arc<dyn CheckpointSaver> = Arc::new(InMemoryCheckpointSaver::new());
        let compiled = graph.compile().unwrap().with_checkpointer(checkpointer);

        let outcome = compiled
            .run("t1", json!({}), &schema(), EventSink::null(), CancellationToken::new())
            .await
            .unwrap();
        let (node, payload) = match outcome {
            RunOutcome::Interrupted { node, payload, .. } => (node, payload),
            other => panic!("expected Interrupted, got {other:?}"),
        };
        assert_eq!(node, "approval");
        assert_eq!(payload, json!({"question": "approve?"}));

        let resumed = compiled
            .resume("t1", json!(true), &schema(), EventSink::null(), CancellationToken::new())
            .await
            .unwrap();
        match resumed {
            RunOutcome::Finished { state } => assert_eq!(state["approved"], json!(true)),
            other => panic!("expected Finished, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn step_limit_is_enforced() {
        let mut graph = Graph::new();
        graph.add_node("loop", |_s: Value| async { Ok(json!({})) }).unwrap();
        graph.add_edge(START, "loop");
        graph.add_edge("loop", "loop");
        let compiled = graph
            .compile()
            .unwrap()
            .with_config(ExecutorConfig { step_limit: 3, ..ExecutorConfig::default() });

        let err = compiled
            .run("t1", json!({}), &schema(), EventSink::null(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::StepLimitExceeded { .. }));
    }
}
