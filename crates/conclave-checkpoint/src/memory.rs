//! In-memory checkpoint backend. Convenient for tests and short-lived
//! processes; offers no crash recovery (the default the teacher warns about
//! in its own in-memory saver).

use crate::error::Result;
use crate::traits::{Checkpoint, CheckpointSaver};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryCheckpointSaver {
    threads: Mutex<HashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointSaver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointSaver for InMemoryCheckpointSaver {
    async fn save(&self, thread_id: &str, checkpoint: Checkpoint) -> Result<()> {
        self.threads
            .lock()
            .unwrap()
            .insert(thread_id.to_string(), checkpoint);
        Ok(())
    }

    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self.threads.lock().unwrap().get(thread_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn round_trips_latest_checkpoint() {
        let saver = InMemoryCheckpointSaver::new();
        assert!(saver.load_latest("t1").await.unwrap().is_none());

        saver
            .save("t1", Checkpoint::new(1, json!({"a": 1})))
            .await
            .unwrap();
        saver
            .save("t1", Checkpoint::new(2, json!({"a": 2})))
            .await
            .unwrap();

        let latest = saver.load_latest("t1").await.unwrap().unwrap();
        assert_eq!(latest.step, 2);
        assert_eq!(latest.state, json!({"a": 2}));
    }

    #[tokio::test]
    async fn threads_are_independent() {
        let saver = InMemoryCheckpointSaver::new();
        saver
            .save("a", Checkpoint::new(1, json!({"x": "a"})))
            .await
            .unwrap();
        saver
            .save("b", Checkpoint::new(1, json!({"x": "b"})))
            .await
            .unwrap();

        assert_eq!(saver.load_latest("a").await.unwrap().unwrap().state, json!({"x": "a"}));
        assert_eq!(saver.load_latest("b").await.unwrap().unwrap().state, json!({"x": "b"}));
    }
}
