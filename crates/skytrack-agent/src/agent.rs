use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use skytrack_core::{
    LivenessMonitor, Ports, StatusPoller, TaskRegistry, TrackerConfig, TrackerError, tracker_id,
};
use skytrack_model::{JobResource, JobSpec, NormalizedPhase, RemoteJobMetadata};
use skytrack_observe::logger_init;
use skytrack_store::{JobFiles, LocalStore, MemoryStore, ObjectStore};

use crate::{
    config::{AgentConfig, StoreConfig},
    error::AgentError,
    handler::AgentHandler,
    remote::out_of_band_down,
};

/// Job tracker of one agent process.
pub struct TrackerAgent {
    registry: TaskRegistry,
    poller: StatusPoller,
    liveness: LivenessMonitor,
}

impl TrackerAgent {
    pub fn new(
        config: TrackerConfig,
        tracker: impl Into<String>,
        store: Arc<dyn ObjectStore>,
        ports: Ports,
    ) -> Result<Self, AgentError> {
        config.validate().map_err(crate::ConfigError::from)?;
        let liveness = LivenessMonitor::new(Arc::clone(&store), config.staleness_threshold());
        let poller = StatusPoller::new(Arc::clone(&store));
        let registry = TaskRegistry::new(config, tracker, store, ports);
        Ok(Self {
            registry,
            poller,
            liveness,
        })
    }

    /// Builds the store named by `cfg` and resolves the tracker identity.
    pub fn from_config(cfg: &AgentConfig, ports: Ports) -> Result<Self, AgentError> {
        cfg.validate()?;
        let store: Arc<dyn ObjectStore> = match &cfg.store {
            StoreConfig::Memory => Arc::new(MemoryStore::new()),
            StoreConfig::Local { root } => Arc::new(LocalStore::new(root.clone())),
        };
        let tracker = cfg
            .tracker_id
            .clone()
            .unwrap_or_else(|| tracker_id().to_string());
        info!(target: "skytrack::agent", tracker = %tracker, store = ?cfg.store, "agent configured");
        Self::new(cfg.tracker.clone(), tracker, store, ports)
    }

    /// Installs the global subscriber described by `cfg.logger`.
    pub fn init_logging(cfg: &AgentConfig) -> Result<(), AgentError> {
        logger_init(&cfg.logger)?;
        Ok(())
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &str {
        self.registry.tracker()
    }

    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }

    fn files(&self, meta: &RemoteJobMetadata) -> JobFiles {
        JobFiles::from_metadata(self.registry.store(), meta)
    }

    async fn resource(&self, meta: &RemoteJobMetadata) -> Result<JobResource, AgentError> {
        let files = self.files(meta);
        if let Some(log) = files.get_error_log().await? {
            return Ok(JobResource::failed(log));
        }

        let report = self.poller.get_status(meta).await?;
        let mut notes: Vec<String> = report.message.into_iter().collect();
        if !report.phase.is_terminal()
            && meta.tracker_hostname != self.tracker()
            && !self.liveness.is_alive(meta).await
        {
            let stale = TrackerError::TimeoutDetected {
                tracker: meta.tracker_hostname.clone(),
            };
            notes.push(format!("{stale}; reporting the last recorded status"));
        }

        let mut resource = JobResource::new(report.phase);
        if !notes.is_empty() {
            resource = resource.with_message(notes.join("; "));
        }
        if report.phase == NormalizedPhase::Succeeded {
            resource = resource.with_outputs(files.paths().status());
        }
        Ok(resource)
    }
}

#[async_trait]
impl AgentHandler for TrackerAgent {
    async fn create(&self, spec: JobSpec) -> Result<RemoteJobMetadata, AgentError> {
        let controller = self.registry.register(&spec).await?;
        info!(target: "skytrack::agent", job = %controller.identity(), "job created");
        Ok(controller.metadata().clone())
    }

    async fn get(&self, meta: &RemoteJobMetadata) -> JobResource {
        match self.resource(meta).await {
            Ok(resource) => resource,
            Err(e) => JobResource::failed(format!("status unavailable: {e}")),
        }
    }

    async fn delete(&self, meta: &RemoteJobMetadata) -> Result<(), AgentError> {
        let identity = meta.identity();
        let files = self.files(meta);
        let already_requested = files.deletion_requested().await?;
        files.request_deletion(meta).await?;

        match self.registry.get(&identity) {
            Some(controller) if controller.is_started() => {
                self.registry.delete(&identity).await;
                debug!(target: "skytrack::agent", job = %identity, "owned job deleted");
                return Ok(());
            }
            Some(_) => {
                // Indexed from an existing marker; the launch belongs to another run.
                self.registry.remove(&identity);
            }
            None => {}
        }

        if already_requested {
            debug!(target: "skytrack::agent", job = %identity, "deletion already requested");
            return Ok(());
        }
        if meta.tracker_hostname == self.tracker() {
            debug!(target: "skytrack::agent", job = %identity, "no local controller; marker written");
            return Ok(());
        }
        if self.liveness.is_alive(meta).await {
            debug!(
                target: "skytrack::agent",
                job = %identity,
                tracker = %meta.tracker_hostname,
                "owner is alive; it will observe the deletion marker"
            );
            return Ok(());
        }
        out_of_band_down(&self.registry.store(), self.registry.ports(), meta).await;
        Ok(())
    }
}
