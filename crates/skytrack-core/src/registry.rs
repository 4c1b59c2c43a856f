use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{Arc, Mutex, PoisonError, RwLock, Weak},
};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use skytrack_model::{JobIdentity, JobSpec, TaskStatus};
use skytrack_store::{ObjectStore, RemotePathRegistry, TrackerPaths};

use crate::{
    config::TrackerConfig,
    controller::{TaskLifecycleController, TeardownHook},
    error::{PortError, TrackerError},
    events::{EventKind, log_event},
    ports::Ports,
    sync::StateSync,
};

#[derive(Default)]
struct Table {
    jobs: HashMap<JobIdentity, Arc<TaskLifecycleController>>,
    by_cluster: HashMap<String, HashSet<JobIdentity>>,
}

impl Table {
    fn insert(&mut self, controller: Arc<TaskLifecycleController>) {
        let identity = controller.identity().clone();
        self.by_cluster
            .entry(identity.cluster_name.clone())
            .or_default()
            .insert(identity.clone());
        self.jobs.insert(identity, controller);
    }

    fn remove(&mut self, identity: &JobIdentity) -> Option<Arc<TaskLifecycleController>> {
        let removed = self.jobs.remove(identity)?;
        if let Some(set) = self.by_cluster.get_mut(&identity.cluster_name) {
            set.remove(identity);
            if set.is_empty() {
                self.by_cluster.remove(&identity.cluster_name);
            }
        }
        Some(removed)
    }

    fn on_cluster(&self, cluster: &str) -> Vec<Arc<TaskLifecycleController>> {
        let mut out: Vec<_> = self
            .by_cluster
            .get(cluster)
            .into_iter()
            .flatten()
            .filter_map(|id| self.jobs.get(id).cloned())
            .collect();
        out.sort_by(|a, b| a.identity().task_name.cmp(&b.identity().task_name));
        out
    }
}

struct RegistryInner {
    config: TrackerConfig,
    tracker: String,
    store: Arc<dyn ObjectStore>,
    ports: Ports,
    table: RwLock<Table>,
    prefixes: Arc<RwLock<BTreeSet<String>>>,
    register_lock: tokio::sync::Mutex<()>,
    teardown_lock: tokio::sync::Mutex<()>,
    sync: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

/// Process-wide index of lifecycle controllers.
///
/// Registration is serialized within the process. Across processes the
/// registration marker is a best-effort existence check, not a lock.
#[derive(Clone)]
pub struct TaskRegistry {
    inner: Arc<RegistryInner>,
}

impl TaskRegistry {
    pub fn new(
        config: TrackerConfig,
        tracker: impl Into<String>,
        store: Arc<dyn ObjectStore>,
        ports: Ports,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                tracker: tracker.into(),
                store,
                ports,
                table: RwLock::new(Table::default()),
                prefixes: Arc::new(RwLock::new(BTreeSet::new())),
                register_lock: tokio::sync::Mutex::new(()),
                teardown_lock: tokio::sync::Mutex::new(()),
                sync: Mutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn tracker(&self) -> &str {
        &self.inner.tracker
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.inner.store)
    }

    pub fn ports(&self) -> &Ports {
        &self.inner.ports
    }

    /// Registers a job and starts its controller.
    ///
    /// Idempotent by identity: a job already in the table is returned as is. A job whose
    /// registration marker already exists is indexed without being launched again.
    /// A fresh launch first clears the job files of any earlier run of the same identity.
    pub async fn register(
        &self,
        spec: &JobSpec,
    ) -> Result<Arc<TaskLifecycleController>, TrackerError> {
        spec.validate()?;
        let identity = spec.identity(&self.inner.config.managed_cluster_name);

        let _serial = self.inner.register_lock.lock().await;
        if let Some(existing) = self.get(&identity) {
            log_event(EventKind::AlreadyRegistered, &identity, None);
            return Ok(existing);
        }

        let markers = self.markers(&spec.task_metadata_prefix);
        let unique_id = identity.unique_id();
        let controller = Arc::new(TaskLifecycleController::new(
            spec.clone(),
            &self.inner.tracker,
            self.inner.config.clone(),
            Arc::clone(&self.inner.store),
            self.inner.ports.clone(),
        ));

        if markers.task_exists(&unique_id).await? {
            log_event(EventKind::AlreadyRegistered, &identity, None);
            self.write_table().insert(Arc::clone(&controller));
            return Ok(controller);
        }

        markers.touch_task(&unique_id).await?;
        controller.files().reset().await?;
        self.ensure_sync(&spec.task_metadata_prefix);
        self.write_table().insert(Arc::clone(&controller));
        controller.start(self.hook())?;
        log_event(EventKind::Registered, &identity, None);
        Ok(controller)
    }

    pub fn get(&self, identity: &JobIdentity) -> Option<Arc<TaskLifecycleController>> {
        self.read_table().jobs.get(identity).cloned()
    }

    /// Controllers on `cluster`, ordered by task name.
    pub fn list_by_cluster(&self, cluster: &str) -> Vec<Arc<TaskLifecycleController>> {
        self.read_table().on_cluster(cluster)
    }

    pub fn len(&self) -> usize {
        self.read_table().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops the controller from the index without touching its tasks.
    ///
    /// The state sync stops publishing under a prefix once no started job uses it.
    pub fn remove(&self, identity: &JobIdentity) -> Option<Arc<TaskLifecycleController>> {
        let (removed, prefix_in_use) = {
            let mut table = self.write_table();
            let removed = table.remove(identity);
            let in_use = removed.as_ref().is_some_and(|gone| {
                let prefix = &gone.metadata().task_metadata_prefix;
                table
                    .jobs
                    .values()
                    .any(|c| c.is_started() && &c.metadata().task_metadata_prefix == prefix)
            });
            (removed, in_use)
        };
        let removed = removed?;
        log_event(EventKind::Removed, identity, None);
        if removed.is_started() && !prefix_in_use {
            let prefix = &removed.metadata().task_metadata_prefix;
            self.inner
                .prefixes
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(prefix);
            debug!(target: "skytrack::registry", prefix = %prefix, "state sync prefix released");
        }
        Some(removed)
    }

    /// Prefixes the state sync currently publishes under.
    pub fn sync_prefixes(&self) -> Vec<String> {
        self.inner
            .prefixes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Cancels the job, waits for its teardown and removes it from the index.
    pub async fn delete(&self, identity: &JobIdentity) -> Option<Arc<TaskLifecycleController>> {
        let controller = self.get(identity)?;
        controller.cancel();
        controller.join().await;
        self.remove(identity)
    }

    /// Cancels every controller, waits for their teardown and stops the state sync.
    pub async fn shutdown(&self) {
        let controllers: Vec<_> = self.read_table().jobs.values().cloned().collect();
        for controller in &controllers {
            controller.cancel();
        }
        for controller in &controllers {
            controller.join().await;
        }

        self.inner.shutdown.cancel();
        let handle = self
            .inner
            .sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        debug!(target: "skytrack::registry", jobs = controllers.len(), "registry shut down");
    }

    /// Stops the job's cluster unless another active job still runs on it, then deletes
    /// the job's registration marker. Jobs indexed from a foreign marker never count as active.
    pub(crate) async fn on_terminal(&self, controller: &TaskLifecycleController) {
        let _serial = self.inner.teardown_lock.lock().await;
        let cluster = controller.cluster_name();
        let active = self
            .list_by_cluster(cluster)
            .iter()
            .filter(|c| {
                c.identity() != controller.identity()
                    && c.is_started()
                    && c.status() != TaskStatus::Done
            })
            .count();

        if active == 0 {
            match self.inner.ports.deprovision.stop(cluster).await {
                Ok(()) => log_event(EventKind::ClusterStopped, &cluster, None),
                Err(PortError::Unsupported(reason)) => {
                    log_event(EventKind::StopUnsupported, &cluster, Some(&reason))
                }
                Err(e) => log_event(EventKind::StopFailed, &cluster, Some(&e.to_string())),
            }
        } else {
            log_event(EventKind::ClusterBusy, &cluster, Some(&active.to_string()));
        }

        let markers = self.markers(&controller.metadata().task_metadata_prefix);
        if let Err(e) = markers.delete_task(&controller.identity().unique_id()).await {
            warn!(
                target: "skytrack::registry",
                job = %controller.identity(),
                error = %e,
                "failed to delete registration marker"
            );
        }
    }

    fn markers(&self, prefix: &str) -> RemotePathRegistry {
        RemotePathRegistry::new(
            Arc::clone(&self.inner.store),
            TrackerPaths::new(prefix, self.inner.tracker.clone()),
        )
    }

    fn hook(&self) -> Arc<dyn TeardownHook> {
        Arc::new(RegistryHook {
            inner: Arc::downgrade(&self.inner),
        })
    }

    /// Publishes state and heartbeat under `prefix`; the sync task is spawned once.
    fn ensure_sync(&self, prefix: &str) {
        self.inner
            .prefixes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(prefix.to_string());

        let mut slot = self.inner.sync.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }
        let task = StateSync::new(
            Arc::clone(&self.inner.store),
            self.inner.tracker.clone(),
            self.inner.config.state_dir.clone(),
            Arc::clone(&self.inner.prefixes),
            self.inner.config.sync_interval(),
        )
        .into_task();
        let token = self.inner.shutdown.child_token();
        *slot = Some(tokio::spawn(async move {
            if let Err(e) = task.spawn(token).await {
                warn!(target: "skytrack::registry", error = %e, "state sync stopped");
            }
        }));
    }

    fn read_table(&self) -> std::sync::RwLockReadGuard<'_, Table> {
        self.inner.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_table(&self) -> std::sync::RwLockWriteGuard<'_, Table> {
        self.inner.table.write().unwrap_or_else(PoisonError::into_inner)
    }
}

struct RegistryHook {
    inner: Weak<RegistryInner>,
}

#[async_trait]
impl TeardownHook for RegistryHook {
    async fn on_terminal(&self, controller: &TaskLifecycleController) {
        match self.inner.upgrade() {
            Some(inner) => TaskRegistry { inner }.on_terminal(controller).await,
            None => debug!(
                target: "skytrack::registry",
                job = %controller.identity(),
                "registry dropped before teardown"
            ),
        }
    }
}
