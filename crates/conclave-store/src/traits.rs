//! The [`DesignStore`] trait: durable persistence for finalized records,
//! independent of the checkpoint layer above it. A checkpoint tracks an
//! in-flight execution; a store entry is what's left once a design
//! finishes (or is abandoned) and the execution state no longer matters.

use crate::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Storage for records of type `T`, keyed by an opaque id (the pipeline
/// uses the design id).
#[async_trait]
pub trait DesignStore<T>: Send + Sync
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn save(&self, id: &str, record: &T) -> Result<()>;
    async fn load(&self, id: &str) -> Result<T>;
    async fn list(&self) -> Result<Vec<String>>;
    async fn delete(&self, id: &str) -> Result<()>;
}
