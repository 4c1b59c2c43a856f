//! In-memory provisioner ports for tests.

use std::{
    collections::{HashMap, VecDeque},
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use skytrack_exec::{LaunchPort, LaunchRequest, LaunchResult};
use skytrack_model::{JobId, JobIdentity};

use crate::{
    error::PortError,
    ports::{DeprovisionPort, Ports, StatusPort},
};

/// Returns a fixed outcome after `delay`.
pub struct FakeLaunch {
    outcome: LaunchResult,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeLaunch {
    pub fn ok(job_id: JobId) -> Self {
        Self::with_outcome(Ok(job_id), Duration::ZERO)
    }

    pub fn with_outcome(outcome: LaunchResult, delay: Duration) -> Self {
        Self {
            outcome,
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LaunchPort for FakeLaunch {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn launch(&self, _request: &LaunchRequest) -> LaunchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.outcome.clone()
    }
}

/// Replays a status script per task name; the last entry repeats.
#[derive(Default)]
pub struct ScriptedStatus {
    scripts: Mutex<HashMap<String, VecDeque<String>>>,
    failing: Mutex<bool>,
}

impl ScriptedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, task: &str, statuses: &[&str]) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task.to_string(), statuses.iter().map(|s| s.to_string()).collect());
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap_or_else(PoisonError::into_inner) = failing;
    }
}

#[async_trait]
impl StatusPort for ScriptedStatus {
    async fn job_status(
        &self,
        identity: &JobIdentity,
        _job_id: Option<JobId>,
    ) -> Result<Option<String>, PortError> {
        if *self.failing.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(PortError::Failed("status backend unavailable".into()));
        }
        let mut scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(script) = scripts.get_mut(&identity.task_name) else {
            return Ok(None);
        };
        if script.len() > 1 {
            Ok(script.pop_front())
        } else {
            Ok(script.front().cloned())
        }
    }
}

/// Records stop/down calls.
#[derive(Default)]
pub struct RecordingDeprovision {
    stops: Mutex<Vec<String>>,
    downs: Mutex<Vec<(String, Option<PathBuf>)>>,
    stop_unsupported: bool,
    down_unsupported: bool,
}

impl RecordingDeprovision {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unsupported() -> Self {
        Self {
            stop_unsupported: true,
            down_unsupported: true,
            ..Self::default()
        }
    }

    pub fn stops(&self) -> Vec<String> {
        self.stops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn downs(&self) -> Vec<(String, Option<PathBuf>)> {
        self.downs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DeprovisionPort for RecordingDeprovision {
    async fn stop(&self, cluster: &str) -> Result<(), PortError> {
        self.stops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cluster.to_string());
        if self.stop_unsupported {
            return Err(PortError::Unsupported(format!("{cluster} cannot be stopped")));
        }
        Ok(())
    }

    async fn down(&self, cluster: &str, state_dir: Option<&Path>) -> Result<(), PortError> {
        self.downs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((cluster.to_string(), state_dir.map(Path::to_path_buf)));
        if self.down_unsupported {
            return Err(PortError::Unsupported(format!("{cluster} cannot be torn down")));
        }
        Ok(())
    }
}

/// Bundle of fakes with typed handles kept for assertions.
pub struct FakePorts {
    pub launch: Arc<FakeLaunch>,
    pub status: Arc<ScriptedStatus>,
    pub deprovision: Arc<RecordingDeprovision>,
}

impl FakePorts {
    pub fn new(launch: FakeLaunch) -> Self {
        Self::with_deprovision(launch, RecordingDeprovision::new())
    }

    pub fn with_deprovision(launch: FakeLaunch, deprovision: RecordingDeprovision) -> Self {
        Self {
            launch: Arc::new(launch),
            status: Arc::new(ScriptedStatus::new()),
            deprovision: Arc::new(deprovision),
        }
    }

    pub fn ports(&self) -> Ports {
        Ports::new(
            self.launch.clone(),
            self.status.clone(),
            self.deprovision.clone(),
        )
    }
}
