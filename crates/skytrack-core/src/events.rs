//! Lifecycle events of tracked jobs and their log levels.

use std::fmt::Display;

use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // registry
    Registered,
    AlreadyRegistered,
    Removed,

    // launch
    LaunchStarted,
    LaunchDone,

    // supervision
    TaskFailed,
    TaskPanicked,
    CancelRequested,
    DeletionObserved,
    HeartbeatFailed,
    JobFinished,

    // teardown
    TeardownStarted,
    ClusterStopped,
    ClusterBusy,
    StopUnsupported,
    StopFailed,
    OutOfBandDown,

    // tracker
    SyncFailed,
}

#[inline]
pub fn message_for(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Registered => "job registered with the tracker",
        EventKind::AlreadyRegistered => "job already tracked; registration skipped",
        EventKind::Removed => "job removed from the registry",

        EventKind::LaunchStarted => "launch started",
        EventKind::LaunchDone => "launch completed; job is running",

        EventKind::TaskFailed => "supervised task failed; job is terminal",
        EventKind::TaskPanicked => "supervised task panicked; job is terminal",
        EventKind::CancelRequested => "cancellation requested",
        EventKind::DeletionObserved => "deletion marker observed",
        EventKind::HeartbeatFailed => "status upload failed",
        EventKind::JobFinished => "provisioner reported a terminal status",

        EventKind::TeardownStarted => "job is terminal; tearing down",
        EventKind::ClusterStopped => "cluster stopped",
        EventKind::ClusterBusy => "cluster still hosts active jobs; left running",
        EventKind::StopUnsupported => "cluster does not support stop",
        EventKind::StopFailed => "failed to stop cluster",
        EventKind::OutOfBandDown => "tracker is gone; cluster torn down out of band",

        EventKind::SyncFailed => "tracker state sync failed",
    }
}

#[inline]
pub fn log_event(kind: EventKind, job: &dyn Display, reason: Option<&str>) {
    let msg = message_for(kind);
    let reason = reason.unwrap_or("");

    match kind {
        EventKind::Registered => info!(target: "skytrack::events", job = %job, "{msg}"),
        EventKind::AlreadyRegistered => trace!(target: "skytrack::events", job = %job, "{msg}"),
        EventKind::Removed => debug!(target: "skytrack::events", job = %job, "{msg}"),

        EventKind::LaunchStarted => debug!(target: "skytrack::events", job = %job, "{msg}"),
        EventKind::LaunchDone => info!(target: "skytrack::events", job = %job, reason, "{msg}"),

        EventKind::TaskFailed | EventKind::TaskPanicked | EventKind::StopFailed => {
            error!(target: "skytrack::events", job = %job, reason, "{msg}")
        }
        EventKind::CancelRequested | EventKind::DeletionObserved => {
            info!(target: "skytrack::events", job = %job, "{msg}")
        }
        EventKind::HeartbeatFailed | EventKind::StopUnsupported | EventKind::SyncFailed => {
            warn!(target: "skytrack::events", job = %job, reason, "{msg}")
        }
        EventKind::JobFinished => info!(target: "skytrack::events", job = %job, reason, "{msg}"),

        EventKind::TeardownStarted => debug!(target: "skytrack::events", job = %job, "{msg}"),
        EventKind::ClusterStopped | EventKind::OutOfBandDown => {
            info!(target: "skytrack::events", cluster = %job, "{msg}")
        }
        EventKind::ClusterBusy => {
            debug!(target: "skytrack::events", cluster = %job, active = reason, "{msg}")
        }
    }
}
