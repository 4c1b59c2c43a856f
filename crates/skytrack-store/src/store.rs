use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::StoreError;

/// Minimal shared object store.
///
/// Keys are `/`-separated relative paths. Every operation is safe to call concurrently
/// from several processes addressing the same key; the last write wins.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    async fn put(&self, path: &str, data: Vec<u8>) -> Result<(), StoreError>;

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.get(path).await?.is_some())
    }

    /// Removing a missing object is not an error.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// All keys starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

pub async fn put_json<T: Serialize + ?Sized>(
    store: &dyn ObjectStore,
    path: &str,
    value: &T,
) -> Result<(), StoreError> {
    let data = serde_json::to_vec(value).map_err(|source| StoreError::Encode {
        path: path.to_string(),
        source,
    })?;
    store.put(path, data).await
}

pub async fn get_json<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    path: &str,
) -> Result<Option<T>, StoreError> {
    let Some(data) = store.get(path).await? else {
        return Ok(None);
    };
    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|source| StoreError::Decode {
            path: path.to_string(),
            source,
        })
}

/// In-process object store.
///
/// Also counts writes per key, which tests use to assert idempotency.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    objects: BTreeMap<String, Vec<u8>>,
    writes: HashMap<String, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls that targeted `path`.
    pub fn write_count(&self, path: &str) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.writes.get(path).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, path: &str, data: Vec<u8>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.objects.insert(path.to_string(), data);
        *inner.writes.entry(path.to_string()).or_default() += 1;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.objects.get(path).cloned())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.objects.remove(path);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .objects
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete() {
        let store = MemoryStore::new();
        store.put("a/b", b"1".to_vec()).await.unwrap();

        assert_eq!(store.get("a/b").await.unwrap(), Some(b"1".to_vec()));
        assert!(store.exists("a/b").await.unwrap());

        store.delete("a/b").await.unwrap();
        store.delete("a/b").await.unwrap();
        assert!(!store.exists("a/b").await.unwrap());
        assert_eq!(store.write_count("a/b"), 1);
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let store = MemoryStore::new();
        for key in ["p/x/1", "p/x/2", "p/y/1", "q/x/1"] {
            store.put(key, Vec::new()).await.unwrap();
        }

        assert_eq!(store.list("p/x/").await.unwrap(), vec!["p/x/1", "p/x/2"]);
        assert_eq!(store.list("p/").await.unwrap().len(), 3);
        assert!(store.list("z/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn json_helpers() {
        let store = MemoryStore::new();
        put_json(&store, "v.json", &vec![1, 2, 3]).await.unwrap();

        let back: Option<Vec<u32>> = get_json(&store, "v.json").await.unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));

        let missing: Option<Vec<u32>> = get_json(&store, "none.json").await.unwrap();
        assert!(missing.is_none());

        store.put("bad.json", b"{".to_vec()).await.unwrap();
        let err = get_json::<Vec<u32>>(&store, "bad.json").await.unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }
}
