use std::{sync::Arc, time::SystemTime};

use skytrack_model::{JobIdentity, RemoteJobMetadata, StatusRecord, TrackerHeartbeat};
use tracing::{debug, trace};

use crate::{JobPaths, ObjectStore, StoreError, TrackerPaths, get_json, put_json};

/// Tracker-level bookkeeping: registration markers, heartbeat and state bundle.
///
/// All operations are idempotent. Cross-process exclusion rests on the
/// `task_exists` / `touch_task` pair, which is check-then-act and therefore racy.
#[derive(Clone)]
pub struct RemotePathRegistry {
    store: Arc<dyn ObjectStore>,
    paths: TrackerPaths,
}

impl RemotePathRegistry {
    pub fn new(store: Arc<dyn ObjectStore>, paths: TrackerPaths) -> Self {
        Self { store, paths }
    }

    pub fn paths(&self) -> &TrackerPaths {
        &self.paths
    }

    /// Create the registration marker of `unique_id` unless it already exists.
    pub async fn touch_task(&self, unique_id: &str) -> Result<(), StoreError> {
        let marker = self.paths.task_marker(unique_id);
        if self.store.exists(&marker).await? {
            trace!(target: "skytrack::store", unique_id, "marker already present");
            return Ok(());
        }
        put_json(
            self.store.as_ref(),
            &marker,
            &serde_json::json!({ "tracker": self.paths.tracker() }),
        )
        .await?;
        debug!(target: "skytrack::store", unique_id, "task marker created");
        Ok(())
    }

    pub async fn task_exists(&self, unique_id: &str) -> Result<bool, StoreError> {
        self.store.exists(&self.paths.task_marker(unique_id)).await
    }

    pub async fn delete_task(&self, unique_id: &str) -> Result<(), StoreError> {
        self.store.delete(&self.paths.task_marker(unique_id)).await?;
        debug!(target: "skytrack::store", unique_id, "task marker removed");
        Ok(())
    }

    pub async fn put_heartbeat(&self, files: u32) -> Result<(), StoreError> {
        let beat = TrackerHeartbeat {
            tracker_hostname: self.paths.tracker().to_string(),
            uploaded_at: SystemTime::now(),
            files,
        };
        put_json(self.store.as_ref(), &self.paths.heartbeat(), &beat).await
    }

    /// Time of the most recent heartbeat, `None` if none was ever written.
    pub async fn last_heartbeat(&self) -> Result<Option<SystemTime>, StoreError> {
        let beat: Option<TrackerHeartbeat> =
            get_json(self.store.as_ref(), &self.paths.heartbeat()).await?;
        Ok(beat.map(|b| b.uploaded_at))
    }

    pub async fn put_state_file(&self, relative: &str, data: Vec<u8>) -> Result<(), StoreError> {
        self.store.put(&self.paths.state_file(relative), data).await
    }

    /// Uploaded state bundle as `(relative path, contents)` pairs.
    pub async fn state_files(&self) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let root = self.paths.state_root();
        let mut files = Vec::new();
        for key in self.store.list(&root).await? {
            if let Some(data) = self.store.get(&key).await? {
                files.push((key[root.len()..].to_string(), data));
            }
        }
        Ok(files)
    }
}

/// Job-level bookkeeping files.
#[derive(Clone)]
pub struct JobFiles {
    store: Arc<dyn ObjectStore>,
    paths: JobPaths,
}

impl JobFiles {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: &str, identity: &JobIdentity) -> Self {
        Self {
            store,
            paths: JobPaths::new(prefix, identity),
        }
    }

    pub fn from_metadata(store: Arc<dyn ObjectStore>, meta: &RemoteJobMetadata) -> Self {
        Self {
            store,
            paths: JobPaths::from_metadata(meta),
        }
    }

    pub fn paths(&self) -> &JobPaths {
        &self.paths
    }

    pub async fn put_status(&self, record: &StatusRecord) -> Result<(), StoreError> {
        put_json(self.store.as_ref(), &self.paths.status(), record).await
    }

    pub async fn get_status(&self) -> Result<Option<StatusRecord>, StoreError> {
        get_json(self.store.as_ref(), &self.paths.status()).await
    }

    pub async fn put_error_log(&self, text: &str) -> Result<(), StoreError> {
        self.store
            .put(&self.paths.error_log(), text.as_bytes().to_vec())
            .await
    }

    pub async fn get_error_log(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .store
            .get(&self.paths.error_log())
            .await?
            .map(|data| String::from_utf8_lossy(&data).into_owned()))
    }

    /// Ask whichever tracker owns the job to cancel it.
    pub async fn request_deletion(&self, requested_by: &RemoteJobMetadata) -> Result<(), StoreError> {
        put_json(self.store.as_ref(), &self.paths.delete_marker(), requested_by).await
    }

    pub async fn deletion_requested(&self) -> Result<bool, StoreError> {
        self.store.exists(&self.paths.delete_marker()).await
    }

    /// Removes what a previous run of the same identity left behind.
    pub async fn reset(&self) -> Result<(), StoreError> {
        for path in [
            self.paths.delete_marker(),
            self.paths.error_log(),
            self.paths.status(),
        ] {
            self.store.delete(&path).await?;
        }
        debug!(target: "skytrack::store", job = self.paths.unique_id(), "job files reset");
        Ok(())
    }
}
