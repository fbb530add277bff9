//! Property test: any checkpoint saved for a thread is exactly what comes
//! back from `load_latest`, through both the in-memory and file backends.

use conclave_checkpoint::{Checkpoint, CheckpointSaver, FileCheckpointSaver, InMemoryCheckpointSaver};
use proptest::prelude::*;
use serde_json::json;

fn arbitrary_state() -> impl Strategy<Value = serde_json::Value> {
    prop::collection::vec((any::<String>(), any::<i64>()), 0..8)
        .prop_map(|pairs| json!(pairs.into_iter().collect::<std::collections::HashMap<_, _>>()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn memory_backend_round_trips(step in 0u64..10_000, state in arbitrary_state()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let saver = InMemoryCheckpointSaver::new();
            saver.save("thread", Checkpoint::new(step, state.clone())).await.unwrap();
            let loaded = saver.load_latest("thread").await.unwrap().unwrap();
            prop_assert_eq!(loaded.step, step);
            prop_assert_eq!(loaded.state, state);
            Ok(())
        })?;
    }

    #[test]
    fn file_backend_round_trips(step in 0u64..10_000, state in arbitrary_state()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let saver = FileCheckpointSaver::new(dir.path()).await.unwrap();
            saver.save("thread", Checkpoint::new(step, state.clone())).await.unwrap();
            let loaded = saver.load_latest("thread").await.unwrap().unwrap();
            prop_assert_eq!(loaded.step, step);
            prop_assert_eq!(loaded.state, state);
            Ok(())
        })?;
    }
}
