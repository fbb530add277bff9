//! Checkpoint storage for graph executions.
//!
//! A [`CheckpointSaver`] snapshots a thread's state after every superstep so
//! an interrupted or crashed run can resume from the last completed step
//! instead of from scratch. Two backends ship here:
//!
//! - [`InMemoryCheckpointSaver`] — no persistence across process restarts,
//!   used for tests and short CLI demos.
//! - [`FileCheckpointSaver`] — one JSON file per thread, written atomically.
//!
//! ```
//! use conclave_checkpoint::{Checkpoint, CheckpointSaver, InMemoryCheckpointSaver};
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let saver = InMemoryCheckpointSaver::new();
//! saver.save("design-1", Checkpoint::new(0, json!({"current_round": 0}))).await.unwrap();
//! let latest = saver.load_latest("design-1").await.unwrap();
//! assert!(latest.is_some());
//! # });
//! ```

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{CheckpointError, Result};
pub use file::FileCheckpointSaver;
pub use memory::InMemoryCheckpointSaver;
pub use traits::{Checkpoint, CheckpointSaver, PendingInterrupt};
