use thiserror::Error;

use skytrack_exec::LaunchError;
use skytrack_model::ModelError;
use skytrack_store::StoreError;

/// Failure taxonomy of the tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("launch failed: {0}")]
    LaunchFailure(#[from] LaunchError),

    #[error("status poll failed: {0}")]
    PollFailure(String),

    #[error("heartbeat of tracker {tracker} is stale")]
    TimeoutDetected { tracker: String },

    #[error("cancelled by user")]
    CancelledByUser,

    #[error("cluster {cluster} cannot be deprovisioned: {reason}")]
    DeprovisionUnsupported { cluster: String, reason: String },

    #[error("unknown remote state: {0}")]
    UnknownRemoteState(String),

    #[error("object store error: {0}")]
    Store(#[from] StoreError),

    #[error("local state error: {0}")]
    StateIo(String),

    #[error(transparent)]
    InvalidSpec(#[from] ModelError),

    #[error("controller for {0} was already started")]
    AlreadyStarted(String),
}

/// Error returned by provisioner ports.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortError {
    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Failed(String),
}
