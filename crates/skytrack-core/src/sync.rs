use std::{
    collections::BTreeSet,
    path::{Component, Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use taskvisor::{TaskError, TaskFn, TaskRef};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use skytrack_store::{ObjectStore, RemotePathRegistry, TrackerPaths};

use crate::{
    error::TrackerError,
    events::{EventKind, log_event},
};

pub(crate) const STATE_SYNC: &str = "state-sync";

/// Uploads the local provisioner state and then the tracker heartbeat, once per prefix.
///
/// The heartbeat goes last so a fresh heartbeat always implies a complete bundle.
pub struct StateSync {
    store: Arc<dyn ObjectStore>,
    tracker: String,
    state_dir: Option<PathBuf>,
    prefixes: Arc<RwLock<BTreeSet<String>>>,
    interval: Duration,
}

impl StateSync {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        tracker: impl Into<String>,
        state_dir: Option<PathBuf>,
        prefixes: Arc<RwLock<BTreeSet<String>>>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            tracker: tracker.into(),
            state_dir,
            prefixes,
            interval,
        }
    }

    pub fn into_task(self) -> TaskRef {
        let sync = Arc::new(self);
        TaskFn::arc(STATE_SYNC, move |ctx: CancellationToken| {
            let sync = Arc::clone(&sync);
            async move {
                loop {
                    if ctx.is_cancelled() {
                        return Ok::<(), TaskError>(());
                    }
                    match sync.sync_once().await {
                        Ok(files) => trace!(target: "skytrack::sync", files, "tracker state synced"),
                        Err(e) => log_event(EventKind::SyncFailed, &sync.tracker, Some(&e.to_string())),
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(sync.interval) => {}
                        _ = ctx.cancelled() => return Ok(()),
                    }
                }
            }
        })
    }

    /// One sync round. Returns the number of state files uploaded per prefix.
    pub async fn sync_once(&self) -> Result<u32, TrackerError> {
        let files = match &self.state_dir {
            Some(dir) => collect_state(dir).await?,
            None => Vec::new(),
        };
        let count = u32::try_from(files.len()).unwrap_or(u32::MAX);
        let prefixes: Vec<String> = self
            .prefixes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();

        for prefix in prefixes {
            let registry = RemotePathRegistry::new(
                Arc::clone(&self.store),
                TrackerPaths::new(prefix, self.tracker.clone()),
            );
            for (relative, data) in &files {
                registry.put_state_file(relative, data.clone()).await?;
            }
            registry.put_heartbeat(count).await?;
        }
        Ok(count)
    }
}

/// Reads every regular file under `dir` as `(relative path, bytes)`, sorted by path.
async fn collect_state(dir: &Path) -> Result<Vec<(String, Vec<u8>)>, TrackerError> {
    let io = |path: &Path, e: std::io::Error| TrackerError::StateIo(format!("{}: {e}", path.display()));

    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&current).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(io(&current, e)),
        };
        while let Some(entry) = entries.next_entry().await.map_err(|e| io(&current, e))? {
            let path = entry.path();
            let kind = entry.file_type().await.map_err(|e| io(&path, e))?;
            if kind.is_dir() {
                stack.push(path);
            } else if kind.is_file() {
                let Ok(relative) = path.strip_prefix(dir) else {
                    continue;
                };
                let relative = relative
                    .components()
                    .filter_map(|c| c.as_os_str().to_str())
                    .collect::<Vec<_>>()
                    .join("/");
                let data = tokio::fs::read(&path).await.map_err(|e| io(&path, e))?;
                out.push((relative, data));
            }
        }
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

/// Writes a tracker's uploaded state bundle under `dest`. Returns the number of files restored.
pub async fn restore_state(
    registry: &RemotePathRegistry,
    dest: &Path,
) -> Result<usize, TrackerError> {
    let mut restored = 0;
    for (relative, data) in registry.state_files().await? {
        let rel = Path::new(&relative);
        if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
            debug!(target: "skytrack::sync", path = %relative, "skipping unsafe state path");
            continue;
        }
        let target = dest.join(rel);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TrackerError::StateIo(format!("{}: {e}", parent.display())))?;
        }
        tokio::fs::write(&target, data)
            .await
            .map_err(|e| TrackerError::StateIo(format!("{}: {e}", target.display())))?;
        restored += 1;
    }
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use skytrack_store::MemoryStore;

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("skytrack-sync-{name}-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn sync_uploads_bundle_and_heartbeat_per_prefix() {
        let dir = scratch("src");
        tokio::fs::create_dir_all(dir.join("clusters")).await.unwrap();
        tokio::fs::write(dir.join("state.db"), b"db").await.unwrap();
        tokio::fs::write(dir.join("clusters/c1.yaml"), b"c1").await.unwrap();

        let store = Arc::new(MemoryStore::new());
        let prefixes = Arc::new(RwLock::new(BTreeSet::from(["a".to_string(), "b".to_string()])));
        let sync = StateSync::new(
            store.clone(),
            "host-1",
            Some(dir.clone()),
            prefixes,
            Duration::from_secs(1),
        );
        assert_eq!(sync.sync_once().await.unwrap(), 2);

        for prefix in ["a", "b"] {
            let registry = RemotePathRegistry::new(store.clone(), TrackerPaths::new(prefix, "host-1"));
            assert!(registry.last_heartbeat().await.unwrap().is_some());
            let names: Vec<String> = registry
                .state_files()
                .await
                .unwrap()
                .into_iter()
                .map(|(rel, _)| rel)
                .collect();
            assert_eq!(names, vec!["clusters/c1.yaml".to_string(), "state.db".to_string()]);
        }

        let dest = scratch("dst");
        let registry = RemotePathRegistry::new(store, TrackerPaths::new("a", "host-1"));
        assert_eq!(restore_state(&registry, &dest).await.unwrap(), 2);
        assert_eq!(tokio::fs::read(dest.join("clusters/c1.yaml")).await.unwrap(), b"c1");

        let _ = tokio::fs::remove_dir_all(&dir).await;
        let _ = tokio::fs::remove_dir_all(&dest).await;
    }

    #[tokio::test]
    async fn missing_state_dir_still_publishes_heartbeat() {
        let store = Arc::new(MemoryStore::new());
        let prefixes = Arc::new(RwLock::new(BTreeSet::from(["p".to_string()])));
        let sync = StateSync::new(
            store.clone(),
            "host-2",
            Some(scratch("absent")),
            prefixes,
            Duration::from_secs(1),
        );
        assert_eq!(sync.sync_once().await.unwrap(), 0);
        let registry = RemotePathRegistry::new(store, TrackerPaths::new("p", "host-2"));
        assert!(registry.last_heartbeat().await.unwrap().is_some());
    }
}
