use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use tokio::fs;
use tracing::trace;

use crate::{ObjectStore, StoreError};

/// Object store backed by a local (or network-mounted) directory.
///
/// Writes go to a temporary sibling first and are renamed into place,
/// so readers never observe a half-written object.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(key);
        let valid = !key.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StoreError::InvalidPath(key.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

/// Key of a file found below the directory of `dir_key`.
///
/// The key is rebuilt on top of `dir_key` as given, so non-path spellings such as
/// `s3://bucket` survive the trip through the filesystem.
fn key_under(dir_key: &str, start: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(start).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(name) => parts.push(name.to_str()?),
            _ => return None,
        }
    }
    let rel = parts.join("/");
    Some(if dir_key.is_empty() {
        rel
    } else {
        format!("{dir_key}/{rel}")
    })
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(key, e))?;
        }

        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        fs::write(&tmp, &data)
            .await
            .map_err(|e| StoreError::io(key, e))?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::io(key, e));
        }
        trace!(target: "skytrack::store", key, bytes = data.len(), "object written");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(key, e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.resolve(key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(key, e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(key, e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        // Walk only the directory that can contain matches.
        let dir_key = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        let start = if dir_key.is_empty() {
            self.root.clone()
        } else {
            self.resolve(dir_key)?
        };

        let mut keys = Vec::new();
        let mut pending = vec![start.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::io(dir.display().to_string(), e)),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StoreError::io(dir.display().to_string(), e))?
            {
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| StoreError::io(entry.path().display().to_string(), e))?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if let Some(key) = key_under(dir_key, &start, &entry.path())
                    && key.starts_with(prefix)
                    && !is_temp(&key)
                {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn is_temp(key: &str) -> bool {
    key.rsplit('/')
        .next()
        .and_then(|name| name.rsplit('.').next())
        .is_some_and(|ext| ext.starts_with("tmp-"))
}
