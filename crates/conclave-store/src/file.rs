//! File-backed design store: one JSON file per record, written atomically
//! (temp file + rename). Writes to the same id are serialized through a
//! per-id lock so two concurrent saves can't interleave, while saves to
//! different ids proceed independently.

use crate::error::{Result, StoreError};
use crate::traits::DesignStore;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

pub struct FileDesignStore<T> {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    _marker: PhantomData<T>,
}

impl<T> FileDesignStore<T> {
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir, locks: Mutex::new(HashMap::new()), _marker: PhantomData })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn lock_for(&self, id: &str) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[async_trait]
impl<T> DesignStore<T> for FileDesignStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn save(&self, id: &str, record: &T) -> Result<()> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let final_path = self.path_for(id);
        let tmp_path = final_path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<T> {
        let path = self.path_for(id);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(id.to_string())
            } else {
                StoreError::Io(e)
            })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "tmp").unwrap_or(false) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        Ok(ids)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id);
        tokio::fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(id.to_string())
            } else {
                StoreError::Io(e)
            }
        })
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
        let dir = tempfile::tempdir().unwrap();
        let store = FileDesignStore::new(dir.path()).await.unwrap();
        let widget = Widget { name: "bracket".into() };
        store.save("w1", &widget).await.unwrap();
        assert_eq!(store.load("w1").await.unwrap(), widget);
    }

    #[tokio::test]
    async fn load_missing_errors_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store: FileDesignStore<Widget> = FileDesignStore::new(dir.path()).await.unwrap();
        assert!(matches!(store.load("missing").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_excludes_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDesignStore::new(dir.path()).await.unwrap();
        store.save("w1", &Widget { name: "a".into() }).await.unwrap();
        store.save("w2", &Widget { name: "b".into() }).await.unwrap();
        let mut ids = store.list().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["w1".to_string(), "w2".to_string()]);
    }

    #[tokio::test]
    async fn delete_then_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDesignStore::new(dir.path()).await.unwrap();
        store.save("w1", &Widget { name: "a".into() }).await.unwrap();
        store.delete("w1").await.unwrap();
        assert!(matches!(store.load("w1").await, Err(StoreError::NotFound(_))));
    }
}
