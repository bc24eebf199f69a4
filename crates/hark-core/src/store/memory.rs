//! In-process [`Storer`] backed by an ordered map.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Storer, key_to_path, path_to_key};
use crate::error::{StoreError, StoreResult};

/// Volatile store kept in memory. Everything is lost when it is dropped.
///
/// Keys are held in order, so [`list`](Storer::list) results are sorted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn require_path(path: &[String]) -> StoreResult<String> {
    if path.is_empty() {
        return Err(StoreError::EmptyPath);
    }
    Ok(path_to_key(path))
}

#[async_trait]
impl Storer for MemoryStore {
    async fn get(&self, path: &[String]) -> StoreResult<Option<String>> {
        let key = require_path(path)?;
        Ok(self.entries.read().get(&key).cloned())
    }

    async fn list(&self, path: &[String]) -> StoreResult<Vec<Vec<String>>> {
        let entries = self.entries.read();

        if path.is_empty() {
            return entries.keys().map(|k| key_to_path(k)).collect();
        }

        let prefix = format!("{}/", path_to_key(path));
        entries
            .range(prefix.clone()..)
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(&prefix))
            .map(|k| key_to_path(&k[prefix.len()..]))
            .collect()
    }

    async fn set(&self, path: &[String], value: &str) -> StoreResult<()> {
        let key = require_path(path)?;
        self.entries.write().insert(key, value.to_string());
        Ok(())
    }

    async fn unset(&self, path: &[String]) -> StoreResult<()> {
        let key = require_path(path)?;
        self.entries.write().remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::path;

    #[tokio::test]
    async fn test_set_get_unset() {
        let store = MemoryStore::new();
        let p = path(&["greeting"]);

        assert_eq!(store.get(&p).await.unwrap(), None);
        store.set(&p, "hello").await.unwrap();
        assert_eq!(store.get(&p).await.unwrap().as_deref(), Some("hello"));

        store.unset(&p).await.unwrap();
        assert_eq!(store.get(&p).await.unwrap(), None);
        // Unsetting twice is fine.
        tokio_test::assert_ok!(store.unset(&p).await);
    }

    #[tokio::test]
    async fn test_list_under_prefix() {
        let store = MemoryStore::new();
        store.set(&path(&["aliases", "x"]), "1").await.unwrap();
        store.set(&path(&["aliases", "y", "z"]), "2").await.unwrap();
        store.set(&path(&["aliasesx"]), "3").await.unwrap();
        store.set(&path(&["other"]), "4").await.unwrap();

        let listed = store.list(&path(&["aliases"])).await.unwrap();
        assert_eq!(listed, vec![path(&["x"]), path(&["y", "z"])]);

        let all = store.list(&[]).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_empty_path_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(store.set(&[], "v").await, Err(StoreError::EmptyPath)));
        assert!(store.is_empty());
    }
}
