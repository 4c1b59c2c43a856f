use std::sync::Arc;

use tracing::debug;

use skytrack_model::{
    JobLaunchType, NormalizedPhase, ProvisionerStatus, RemoteJobMetadata, StatusRecord, TaskStatus,
};
use skytrack_store::{JobFiles, ObjectStore};

use crate::error::TrackerError;

/// Normalized view of the last status a job published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: NormalizedPhase,
    pub message: Option<String>,
    /// Raw provisioner status, when one was recorded.
    pub raw: Option<String>,
}

impl PhaseReport {
    fn pending() -> Self {
        Self {
            phase: NormalizedPhase::Pending,
            message: None,
            raw: None,
        }
    }
}

/// Maps a raw provisioner status of the given launch type to a phase.
pub fn map_status(launch_type: JobLaunchType, raw: &str) -> Result<NormalizedPhase, TrackerError> {
    ProvisionerStatus::parse(launch_type, raw)
        .map(|status| status.phase())
        .map_err(|e| TrackerError::UnknownRemoteState(e.to_string()))
}

/// Normalizes a published record.
///
/// No record, or one written before the provisioner knew the job, is `Pending`.
/// A tracker that stopped while the job was not yet terminal reads as `Aborted`, with the
/// closing reason as message.
/// Statuses outside the known vocabulary read as `Failed`.
pub fn normalize(launch_type: JobLaunchType, record: Option<&StatusRecord>) -> PhaseReport {
    let Some(record) = record else {
        return PhaseReport::pending();
    };
    let stopped = record.tracker_status == TaskStatus::Done;
    match record.provisioner_status.as_deref() {
        None if stopped => PhaseReport {
            phase: NormalizedPhase::Aborted,
            message: Some(
                record
                    .reason
                    .clone()
                    .unwrap_or_else(|| "tracker finished before the job was launched".into()),
            ),
            raw: None,
        },
        None => PhaseReport::pending(),
        Some(raw) => match map_status(launch_type, raw) {
            Ok(phase) if stopped && !phase.is_terminal() => PhaseReport {
                phase: NormalizedPhase::Aborted,
                message: Some(
                    record
                        .reason
                        .clone()
                        .unwrap_or_else(|| "tracker stopped before the job finished".into()),
                ),
                raw: Some(raw.to_string()),
            },
            Ok(phase) => PhaseReport {
                phase,
                message: None,
                raw: Some(raw.to_string()),
            },
            Err(e) => PhaseReport {
                phase: NormalizedPhase::Failed,
                message: Some(e.to_string()),
                raw: Some(raw.to_string()),
            },
        },
    }
}

/// Reads published job status from the object store.
#[derive(Clone)]
pub struct StatusPoller {
    store: Arc<dyn ObjectStore>,
}

impl StatusPoller {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub async fn get_status(&self, meta: &RemoteJobMetadata) -> Result<PhaseReport, TrackerError> {
        let files = JobFiles::from_metadata(Arc::clone(&self.store), meta);
        let record = files.get_status().await?;
        let report = normalize(meta.job_launch_type, record.as_ref());
        debug!(
            target: "skytrack::poller",
            job = %meta.identity(),
            phase = %report.phase,
            "polled job status"
        );
        Ok(report)
    }
}
