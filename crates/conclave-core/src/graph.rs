//! Graph definition: nodes, static and conditional edges, and the
//! [`NodeExecutor`] trait a node's logic implements.

use crate::error::{GraphError, Result};
use crate::send::ConditionalEdgeResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Sentinel marking the graph's single virtual entry point.
pub const START: &str = "__start__";

/// Sentinel marking the graph's single virtual exit point. A superstep that
/// routes here ends the run.
pub const END: &str = "__end__";

/// A node's unit of work: read `state`, return the partial update to merge
/// back in via the graph's [`crate::state::StateSchema`].
///
/// Implementors should not mutate external state directly — the executor
/// is what applies the returned update, which is what makes checkpointing
/// and resume possible.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    async fn execute(&self, state: &Value) -> anyhow::Result<Value>;
}

#[async_trait]
impl<F, Fut> NodeExecutor for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = anyhow::Result<Value>> + Send,
{
    async fn execute(&self, state: &Value) -> anyhow::Result<Value> {
        (self)(state.clone()).await
    }
}

/// A function deciding where a superstep goes next, given the state after
/// the node it's attached to ran. Sync and cheap by convention — routing
/// logic inspects state, it doesn't call out to collaborators.
pub type ConditionalEdgeFn = Arc<dyn Fn(&Value) -> ConditionalEdgeResult + Send + Sync>;

enum EdgeKind {
    Direct(String),
    Conditional(ConditionalEdgeFn),
}

impl fmt::Debug for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Direct(to) => write!(f, "Direct({to})"),
            EdgeKind::Conditional(_) => write!(f, "Conditional(<fn>)"),
        }
    }
}

/// A graph under construction: nodes plus the edges connecting them.
/// Call [`Graph::compile`] once it's fully wired to get a
/// [`crate::executor::CompiledGraph`] ready to run.
pub struct Graph {
    nodes: HashMap<String, Arc<dyn NodeExecutor>>,
    edges: HashMap<String, EdgeKind>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .finish()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, name: impl Into<String>, executor: impl NodeExecutor + 'static) -> Result<&mut Self> {
        let name = name.into();
        if self.nodes.contains_key(&name) {
            return Err(GraphError::DuplicateNode(name));
        }
        self.nodes.insert(name, Arc::new(executor));
        Ok(self)
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.insert(from.into(), EdgeKind::Direct(to.into()));
        self
    }

    pub fn add_conditional_edge(
        &mut self,
        from: impl Into<String>,
        router: impl Fn(&Value) -> ConditionalEdgeResult + Send + Sync + 'static,
    ) -> &mut Self {
        self.edges.insert(from.into(), EdgeKind::Conditional(Arc::new(router)));
        self
    }

    pub(crate) fn node(&self, name: &str) -> Option<Arc<dyn NodeExecutor>> {
        self.nodes.get(name).cloned()
    }

    pub(crate) fn has_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Resolves the node(s) to run after `from` given the state it just
    /// produced.
    pub(crate) fn route(&self, from: &str, state: &Value) -> Result<ConditionalEdgeResult> {
        match self.edges.get(from) {
            Some(EdgeKind::Direct(to)) => Ok(ConditionalEdgeResult::Node(to.clone())),
            Some(EdgeKind::Conditional(router)) => Ok(router(state)),
            None => Err(GraphError::UnknownNode(format!("{from} has no outgoing edge"))),
        }
    }

    /// Validates that every edge references a registered node (or a
    /// sentinel) and that the graph has an entry point, then freezes it
    /// into a [`crate::executor::CompiledGraph`].
    pub fn compile(self) -> Result<crate::executor::CompiledGraph> {
        if !matches!(self.edges.get(START), Some(EdgeKind::Direct(_)) | Some(EdgeKind::Conditional(_))) {
            return Err(GraphError::NoEntryPoint);
        }
        for (from, edge) in &self.edges {
            if let EdgeKind::Direct(to) = edge {
                if to != END && !self.has_node(to) {
                    return Err(GraphError::UnknownNode(to.clone()));
                }
            }
            if from != START && !self.has_node(from) {
                return Err(GraphError::UnknownNode(from.clone()));
            }
        }
        Ok(crate::executor::CompiledGraph::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn compile_rejects_missing_entry_point() {
        let graph = Graph::new();
        assert!(matches!(graph.compile(), Err(GraphError::NoEntryPoint)));
    }

    #[tokio::test]
    async fn compile_rejects_dangling_edge() {
        let mut graph = Graph::new();
        graph.add_edge(START, "ghost");
        assert!(matches!(graph.compile(), Err(GraphError::UnknownNode(_))));
    }

    #[tokio::test]
    async fn duplicate_node_is_rejected() {
        let mut graph = Graph::new();
        graph.add_node("a", |_s: Value| async { Ok(json!({})) }).unwrap();
        assert!(matches!(graph.add_node("a", |_s: Value| async { Ok(json!({})) }), Err(GraphError::DuplicateNode(_))));
    }

    #[tokio::test]
    async fn compile_accepts_a_minimal_graph() {
        let mut graph = Graph::new();
        graph.add_node("a", |_s: Value| async { Ok(json!({"done": true})) }).unwrap();
        graph.add_edge(START, "a");
        graph.add_edge("a", END);
        assert!(graph.compile().is_ok());
    }
}
