use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use skytrack_model::{JobIdentity, JobSpec};

use crate::LaunchResult;

/// Everything a launcher needs to start one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    pub identity: JobIdentity,
    pub spec: JobSpec,
}

/// Starts a job through the provisioner.
///
/// Implementations may block for a long time; callers run them inside a [`crate::LaunchWorker`].
#[async_trait]
pub trait LaunchPort: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn launch(&self, request: &LaunchRequest) -> LaunchResult;
}
