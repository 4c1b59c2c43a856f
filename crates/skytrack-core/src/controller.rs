use std::{
    sync::{
        Arc, OnceLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::SystemTime,
};

use async_trait::async_trait;
use taskvisor::{TaskError, TaskFn, TaskRef};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use skytrack_exec::{LaunchRequest, LaunchWorker};
use skytrack_model::{JobId, JobIdentity, JobSpec, RemoteJobMetadata, StatusRecord, TaskStatus};
use skytrack_store::{JobFiles, ObjectStore};

use crate::{
    config::TrackerConfig,
    deletion::{DELETION_STATUS, DeletionWatcher},
    error::TrackerError,
    events::{EventKind, log_event},
    heartbeat::{HeartbeatPublisher, UPLOAD_STATUS},
    ports::Ports,
    signals::EventSignals,
    state::StateCell,
};

const LAUNCH: &str = "launch";

/// Invoked exactly once, when a started controller becomes terminal.
#[async_trait]
pub trait TeardownHook: Send + Sync + 'static {
    async fn on_terminal(&self, controller: &TaskLifecycleController);
}

#[derive(Debug, Clone, Copy)]
enum Supervised {
    Launch,
    DeletionStatus,
    UploadStatus,
}

impl Supervised {
    const ALL: [Supervised; 3] = [
        Supervised::Launch,
        Supervised::DeletionStatus,
        Supervised::UploadStatus,
    ];

    fn name(self) -> &'static str {
        match self {
            Supervised::Launch => LAUNCH,
            Supervised::DeletionStatus => DELETION_STATUS,
            Supervised::UploadStatus => UPLOAD_STATUS,
        }
    }

    /// A clean exit of these tasks means the job itself is over.
    fn finishes_on_exit(self) -> bool {
        !matches!(self, Supervised::Launch)
    }
}

/// Owns the lifecycle of one remote job.
pub struct TaskLifecycleController {
    identity: JobIdentity,
    metadata: RemoteJobMetadata,
    spec: JobSpec,
    config: TrackerConfig,
    files: JobFiles,
    ports: Ports,
    state: Arc<StateCell>,
    signals: Arc<EventSignals>,
    started: AtomicBool,
    running: AtomicUsize,
    settled: CancellationToken,
    hook: OnceLock<Arc<dyn TeardownHook>>,
    failure: OnceLock<String>,
}

impl std::fmt::Debug for TaskLifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskLifecycleController")
            .field("identity", &self.identity)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TaskLifecycleController {
    pub fn new(
        spec: JobSpec,
        tracker: &str,
        config: TrackerConfig,
        store: Arc<dyn ObjectStore>,
        ports: Ports,
    ) -> Self {
        let identity = spec.identity(&config.managed_cluster_name);
        let metadata = RemoteJobMetadata {
            job_name: identity.task_name.clone(),
            cluster_name: identity.cluster_name.clone(),
            task_metadata_prefix: spec.task_metadata_prefix.clone(),
            tracker_hostname: tracker.to_string(),
            job_launch_type: identity.job_launch_type,
        };
        let files = JobFiles::new(store, &spec.task_metadata_prefix, &identity);
        Self {
            identity,
            metadata,
            spec,
            config,
            files,
            ports,
            state: Arc::new(StateCell::new()),
            signals: Arc::new(EventSignals::new()),
            started: AtomicBool::new(false),
            running: AtomicUsize::new(0),
            settled: CancellationToken::new(),
            hook: OnceLock::new(),
            failure: OnceLock::new(),
        }
    }

    pub fn identity(&self) -> &JobIdentity {
        &self.identity
    }

    /// Metadata handed back to the host for later Get/Delete calls.
    pub fn metadata(&self) -> &RemoteJobMetadata {
        &self.metadata
    }

    pub fn cluster_name(&self) -> &str {
        &self.identity.cluster_name
    }

    pub fn files(&self) -> &JobFiles {
        &self.files
    }

    pub fn status(&self) -> TaskStatus {
        self.state.status()
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.state.job_id()
    }

    pub fn signals(&self) -> &EventSignals {
        &self.signals
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Spawns the launch, deletion-status and upload-status tasks.
    ///
    /// `hook` runs once, after the job becomes terminal.
    pub fn start(self: &Arc<Self>, hook: Arc<dyn TeardownHook>) -> Result<(), TrackerError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(TrackerError::AlreadyStarted(self.identity.to_string()));
        }
        let _ = self.hook.set(hook);
        self.state.advance(TaskStatus::Launching);
        self.running.store(Supervised::ALL.len(), Ordering::Release);

        for kind in Supervised::ALL {
            let task = match kind {
                Supervised::Launch => self.launch_task(),
                Supervised::DeletionStatus => DeletionWatcher::new(
                    self.identity.clone(),
                    self.files.clone(),
                    Arc::clone(&self.signals),
                    self.config.poll_interval(),
                    self.config.max_heartbeat_failures,
                )
                .into_task(),
                Supervised::UploadStatus => HeartbeatPublisher::new(
                    self.identity.clone(),
                    self.files.clone(),
                    Arc::clone(&self.ports.status),
                    Arc::clone(&self.signals),
                    Arc::clone(&self.state),
                    self.config.heartbeat_interval(),
                    self.config.max_heartbeat_failures,
                )
                .into_task(),
            };
            self.supervise(kind, task);
        }
        Ok(())
    }

    /// Requests cancellation; teardown follows once the tasks observe it.
    pub fn cancel(&self) {
        if !self.signals.is_terminal() {
            log_event(EventKind::CancelRequested, &self.identity, None);
        }
        self.signals.set_cancel();
        if !self.is_started() {
            self.state.mark_done();
        }
    }

    /// Waits until every supervised task has exited and teardown has run.
    pub async fn join(&self) {
        if !self.is_started() {
            return;
        }
        self.settled.cancelled().await;
    }

    fn launch_task(self: &Arc<Self>) -> TaskRef {
        let this = Arc::clone(self);
        TaskFn::arc(LAUNCH, move |ctx: CancellationToken| {
            let this = Arc::clone(&this);
            async move {
                log_event(EventKind::LaunchStarted, &this.identity, None);
                let request = LaunchRequest {
                    identity: this.identity.clone(),
                    spec: this.spec.clone(),
                };
                let worker = LaunchWorker::spawn(Arc::clone(&this.ports.launch), request);
                match worker.supervise(this.config.poll_interval(), &ctx).await {
                    Ok(Some(job_id)) => {
                        this.on_launched(job_id);
                        Ok(())
                    }
                    Ok(None) => Err(TaskError::Canceled),
                    Err(e) => Err(TaskError::Fail { reason: e.report() }),
                }
            }
        })
    }

    fn on_launched(&self, job_id: JobId) {
        if self.state.launched(job_id) {
            self.signals.set_launch_done();
            log_event(
                EventKind::LaunchDone,
                &self.identity,
                Some(&format!("job id {job_id}")),
            );
        }
    }

    fn supervise(self: &Arc<Self>, kind: Supervised, task: TaskRef) {
        let inner = tokio::spawn(task.spawn(self.signals.token()));
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = match inner.await {
                Ok(result) => result,
                Err(e) => {
                    let reason = format!("{} task panicked: {e}", kind.name());
                    log_event(EventKind::TaskPanicked, &this.identity, Some(&reason));
                    Err(TaskError::Fatal { reason })
                }
            };
            this.observe(kind, result).await;
            if this.running.fetch_sub(1, Ordering::AcqRel) == 1 {
                this.publish_closing_status().await;
                this.settled.cancel();
            }
        });
    }

    async fn observe(&self, kind: Supervised, result: Result<(), TaskError>) {
        match result {
            Ok(()) => {
                trace!(target: "skytrack::controller", job = %self.identity, task = kind.name(), "task exited");
                if kind.finishes_on_exit() && !self.signals.is_terminal() {
                    self.signals.set_finished();
                }
            }
            Err(TaskError::Canceled) => {
                trace!(target: "skytrack::controller", job = %self.identity, task = kind.name(), "task cancelled");
            }
            Err(e) => {
                let reason = match &e {
                    TaskError::Fail { reason, .. } | TaskError::Fatal { reason, .. } => reason.clone(),
                    other => other.to_string(),
                };
                log_event(EventKind::TaskFailed, &self.identity, Some(&reason));
                let _ = self.failure.set(reason.clone());
                if let Err(store_err) = self.files.put_error_log(&reason).await {
                    warn!(
                        target: "skytrack::controller",
                        job = %self.identity,
                        error = %store_err,
                        "failed to publish error log"
                    );
                }
                self.signals.set_failed();
            }
        }

        if self.signals.is_terminal() && self.state.mark_done() {
            log_event(EventKind::TeardownStarted, &self.identity, None);
            match self.hook.get() {
                Some(hook) => hook.on_terminal(self).await,
                None => debug!(target: "skytrack::controller", job = %self.identity, "no teardown hook"),
            }
        }
    }

    /// Writes the last status record after every task has exited.
    ///
    /// The record carries `Done` and, for a cancelled or failed job, the reason it stopped.
    async fn publish_closing_status(&self) {
        let previous = match self.files.get_status().await {
            Ok(record) => record,
            Err(e) => {
                warn!(target: "skytrack::controller", job = %self.identity, error = %e, "failed to read last status");
                None
            }
        };
        let reason = match self.failure.get() {
            Some(reason) => Some(reason.clone()),
            None if self.signals.is_cancelled() => Some(TrackerError::CancelledByUser.to_string()),
            None => None,
        };
        let snapshot = self.state.snapshot();
        let record = StatusRecord {
            tracker_status: snapshot.status,
            provisioner_status: previous.and_then(|r| r.provisioner_status),
            job_id: snapshot.job_id,
            reason,
            updated_at: SystemTime::now(),
        };
        match self.files.put_status(&record).await {
            Ok(()) => debug!(target: "skytrack::controller", job = %self.identity, "closing status published"),
            Err(e) => warn!(
                target: "skytrack::controller",
                job = %self.identity,
                error = %e,
                "failed to publish closing status"
            ),
        }
    }
}
