use std::{path::Path, sync::Arc};

use async_trait::async_trait;

use skytrack_exec::LaunchPort;
use skytrack_model::{JobId, JobIdentity};

use crate::error::PortError;

/// Reads the provisioner's raw status string for a job.
#[async_trait]
pub trait StatusPort: Send + Sync + 'static {
    /// `Ok(None)` while the provisioner does not know the job yet.
    async fn job_status(
        &self,
        identity: &JobIdentity,
        job_id: Option<JobId>,
    ) -> Result<Option<String>, PortError>;
}

/// Stops or tears down clusters.
#[async_trait]
pub trait DeprovisionPort: Send + Sync + 'static {
    /// Stops the cluster while keeping its disks.
    async fn stop(&self, cluster: &str) -> Result<(), PortError>;

    /// Tears the cluster down, optionally against restored provisioner state.
    async fn down(&self, cluster: &str, state_dir: Option<&Path>) -> Result<(), PortError>;
}

/// Provisioner adapters shared by every controller of a process.
#[derive(Clone)]
pub struct Ports {
    pub launch: Arc<dyn LaunchPort>,
    pub status: Arc<dyn StatusPort>,
    pub deprovision: Arc<dyn DeprovisionPort>,
}

impl Ports {
    pub fn new(
        launch: Arc<dyn LaunchPort>,
        status: Arc<dyn StatusPort>,
        deprovision: Arc<dyn DeprovisionPort>,
    ) -> Self {
        Self {
            launch,
            status,
            deprovision,
        }
    }
}
