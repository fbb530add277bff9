//! Dynamic fan-out: a conditional edge that doesn't just pick the next
//! node, but spawns a variable number of parallel invocations of one,
//! each with its own argument. This is how proposal, critique, and fidelity
//! worker counts scale with the data in state rather than being fixed at
//! graph-definition time.

use serde_json::Value;

/// One dynamic dispatch: "run `node` once with `arg` as its input,
/// independent of whatever else this superstep sends out."
#[derive(Debug, Clone, PartialEq)]
pub struct Send {
    pub node: String,
    pub arg: Value,
}

impl Send {
    pub fn new(node: impl Into<String>, arg: Value) -> Self {
        Self { node: node.into(), arg }
    }
}

/// What a conditional edge function returns: where to go next, and how.
#[derive(Debug, Clone)]
pub enum ConditionalEdgeResult {
    /// Continue to a single named node (or [`crate::graph::END`]).
    Node(String),

    /// Continue to several named nodes in the same superstep, each running
    /// once against the current state (static fan-out, no per-invocation
    /// argument).
    Nodes(Vec<String>),

    /// Dynamic fan-out: run one node per [`Send`], each with its own
    /// argument, e.g. one `proposal_worker` per collaborator slot.
    Sends(Vec<Send>),
}

impl From<String> for ConditionalEdgeResult {
    fn from(node: String) -> Self {
        ConditionalEdgeResult::Node(node)
    }
}

impl From<&str> for ConditionalEdgeResult {
    fn from(node: &str) -> Self {
        ConditionalEdgeResult::Node(node.to_string())
    }
}

impl From<Vec<Send>> for ConditionalEdgeResult {
    fn from(sends: Vec<Send>) -> Self {
        ConditionalEdgeResult::Sends(sends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn send_carries_its_own_argument() {
        let s = Send::new("proposal_worker", json!({"slot": 0}));
        assert_eq!(s.node, "proposal_worker");
        assert_eq!(s.arg, json!({"slot": 0}));
    }

    #[test]
    fn conditional_edge_result_converts_from_str() {
        let result: ConditionalEdgeResult = "collect_proposals".into();
        assert!(matches!(result, ConditionalEdgeResult::Node(n) if n == "collect_proposals"));
    }
}
