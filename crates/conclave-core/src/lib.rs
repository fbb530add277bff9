//! A small, generic Pregel-style graph executor: typed state with
//! per-field reducers, static and conditional edges, dynamic `Send`
//! fan-out, checkpointing after every superstep, and interrupt/resume for
//! human-in-the-loop nodes.
//!
//! ```text
//!        START
//!          |
//!          v
//!     +---------+
//!     | node a  |
//!     +---------+
//!          |
//!    (conditional edge)
//!       /      \
//!      v        v
//!  Send(w,1) Send(w,2)   <- dynamic fan-out, one superstep
//!      \        /
//!       v      v
//!     +----------+
//!     | collect  |
//!     +----------+
//!          |
//!          v
//!         END
//! ```
//!
//! ```
//! use conclave_core::graph::{Graph, START, END};
//! use conclave_core::state::{StateSchema, SumReducer};
//! use conclave_core::stream::EventSink;
//! use tokio_util::sync::CancellationToken;
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let mut graph = Graph::new();
//! graph.add_node("increment", |s: serde_json::Value| async move {
//!     Ok(json!({"count": s["count"].as_i64().unwrap_or(0) + 1}))
//! }).unwrap();
//! graph.add_edge(START, "increment");
//! graph.add_edge("increment", END);
//!
//! let compiled = graph.compile().unwrap();
//! let schema = StateSchema::new().add_field("count", SumReducer);
//! let outcome = compiled
//!     .run("thread-1", json!({"count": 0}), &schema, EventSink::null(), CancellationToken::new())
//!     .await
//!     .unwrap();
//! # });
//! ```

pub mod error;
pub mod executor;
pub mod graph;
pub mod send;
pub mod state;
pub mod stream;

pub use error::{GraphError, Result};
pub use executor::{CompiledGraph, ExecutorConfig, RunOutcome, INTERRUPT_KEY, RESUME_REPLY_KEY};
pub use graph::{Graph, NodeExecutor, END, START};
pub use send::{ConditionalEdgeResult, Send};
pub use state::{AppendReducer, MergeReducer, OverwriteReducer, Reducer, StateSchema, SumReducer};
pub use stream::{EventSink, StreamEvent};
