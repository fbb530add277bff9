//! Streaming observability: events emitted as a run progresses, so a CLI
//! or UI can show live status instead of waiting for the final state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// One observable moment in a run's life.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StreamEvent {
    /// A superstep started, about to run the named nodes.
    SuperstepStarted { step: u64, nodes: Vec<String> },

    /// A single node finished and its update was merged into state.
    NodeCompleted { step: u64, node: String, update: Value },

    /// A single node failed; the run will error unless the node is
    /// tolerant of partial fan-out failures.
    NodeFailed { step: u64, node: String, error: String },

    /// A checkpoint was written after this step.
    CheckpointSaved { step: u64 },

    /// The run suspended at `node`, waiting for [`crate::executor::CompiledGraph::resume`].
    Interrupted { step: u64, node: String, payload: Value },

    /// The run reached `END`.
    Finished { step: u64, state: Value },
}

/// The sending half of a run's event channel. Cloneable so every concurrent
/// node task in a superstep can emit independently.
#[derive(Clone)]
pub struct EventSink {
    sender: Option<mpsc::UnboundedSender<StreamEvent>>,
}

impl EventSink {
    pub fn new(sender: mpsc::UnboundedSender<StreamEvent>) -> Self {
        Self { sender: Some(sender) }
    }

    /// A sink that discards every event. Useful when a caller doesn't want
    /// to consume a channel but still needs something to pass to `run`.
    pub fn null() -> Self {
        Self { sender: None }
    }

    pub fn emit(&self, event: StreamEvent) {
        if let Some(sender) = &self.sender {
            // A dropped receiver just means nobody's watching; that's not
            // a run failure.
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_sink_drops_without_panicking() {
        let sink = EventSink::null();
        sink.emit(StreamEvent::CheckpointSaved { step: 1 });
    }

    #[tokio::test]
    async fn sink_forwards_to_receiver() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(tx);
        sink.emit(StreamEvent::SuperstepStarted { step: 0, nodes: vec!["a".into()] });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, StreamEvent::SuperstepStarted { step: 0, .. }));
    }

    #[test]
    fn event_round_trips_through_json() {
        let event = StreamEvent::Finished { step: 3, state: json!({"ok": true}) };
        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: StreamEvent = serde_json::from_str(&encoded).unwrap();
        assert!(matches!(decoded, StreamEvent::Finished { step: 3, .. }));
    }
}
