//! Durable persistence for finalized design records.
//!
//! [`DesignStore`] is intentionally generic over the record type: this
//! crate doesn't know about `DesignRecord`, `Proposal`, or anything else
//! from the competitive design pipeline's domain model — it only knows how
//! to durably save, load, list, and delete whatever `Serialize +
//! DeserializeOwned` type the caller hands it, keyed by id.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use file::FileDesignStore;
pub use memory::InMemoryDesignStore;
pub use traits::DesignStore;
