//! In-memory design store. Useful for tests and for CLI demos that don't
//! need records to outlive the process.

use crate::error::{Result, StoreError};
use crate::traits::DesignStore;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryDesignStore<T> {
    records: Mutex<HashMap<String, T>>,
}

impl<T> InMemoryDesignStore<T> {
    pub fn new() -> Self {
        Self { records: Mutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl<T> DesignStore<T> for InMemoryDesignStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + Clone,
{
    async fn save(&self, id: &str, record: &T) -> Result<()> {
        self.records.lock().unwrap().insert(id.to_string(), record.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<T> {
        self.records
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.records.lock().unwrap().keys().cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        name: String,
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = InMemoryDesignStore::new();
        let widget = Widget { name: "bracket".into() };
        store.save("w1", &widget).await.unwrap();
        assert_eq!(store.load("w1").await.unwrap(), widget);
    }

    #[tokio::test]
    async fn load_missing_errors() {
        let store: InMemoryDesignStore<Widget> = InMemoryDesignStore::new();
        assert!(matches!(store.load("missing").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_removes_and_list_reflects_it() {
        let store = InMemoryDesignStore::new();
        store.save("w1", &Widget { name: "a".into() }).await.unwrap();
        store.save("w2", &Widget { name: "b".into() }).await.unwrap();
        store.delete("w1").await.unwrap();
        let mut remaining = store.list().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["w2".to_string()]);
    }
}
