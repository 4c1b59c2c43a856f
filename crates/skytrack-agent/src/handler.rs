use async_trait::async_trait;

use skytrack_model::{JobResource, JobSpec, RemoteJobMetadata};

use crate::error::AgentError;

/// Host-facing job API.
///
/// Get and Delete work from the persisted metadata alone, so they may run in a
/// different process than the Create that produced it.
#[async_trait]
pub trait AgentHandler: Send + Sync + 'static {
    /// Registers and starts a job. Calling it again for the same job does not relaunch it.
    async fn create(&self, spec: JobSpec) -> Result<RemoteJobMetadata, AgentError>;

    /// Current state of a job. Internal failures surface as a `FAILED` resource.
    async fn get(&self, meta: &RemoteJobMetadata) -> JobResource;

    /// Cancels a job. Deleting an already deleted or finished job is a no-op.
    async fn delete(&self, meta: &RemoteJobMetadata) -> Result<(), AgentError>;
}
