use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use taskvisor::{TaskError, TaskFn, TaskRef};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use skytrack_model::{JobIdentity, NormalizedPhase, StatusRecord};
use skytrack_store::JobFiles;

use crate::{
    error::TrackerError,
    events::{EventKind, log_event},
    poller::map_status,
    ports::StatusPort,
    signals::EventSignals,
    state::StateCell,
};

pub(crate) const UPLOAD_STATUS: &str = "upload-status";

/// Periodically publishes the job's status record.
///
/// Once launch is done the provisioner is queried for the current status; a terminal
/// provisioner status ends the publisher after a final upload.
pub struct HeartbeatPublisher {
    identity: JobIdentity,
    files: JobFiles,
    status: Arc<dyn StatusPort>,
    signals: Arc<EventSignals>,
    state: Arc<StateCell>,
    interval: Duration,
    max_failures: u32,
}

impl HeartbeatPublisher {
    pub fn new(
        identity: JobIdentity,
        files: JobFiles,
        status: Arc<dyn StatusPort>,
        signals: Arc<EventSignals>,
        state: Arc<StateCell>,
        interval: Duration,
        max_failures: u32,
    ) -> Self {
        Self {
            identity,
            files,
            status,
            signals,
            state,
            interval,
            max_failures: max_failures.max(1),
        }
    }

    pub fn into_task(self) -> TaskRef {
        let publisher = Arc::new(self);
        TaskFn::arc(UPLOAD_STATUS, move |ctx: CancellationToken| {
            let publisher = Arc::clone(&publisher);
            async move { publisher.run(ctx).await }
        })
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        let mut failures = 0u32;
        loop {
            if ctx.is_cancelled() {
                return Ok(());
            }
            match self.tick().await {
                Ok(Some(phase)) if phase.is_terminal() => {
                    log_event(EventKind::JobFinished, &self.identity, Some(phase.as_str()));
                    return Ok(());
                }
                Ok(_) => failures = 0,
                Err(e) => {
                    failures += 1;
                    let reason = e.to_string();
                    log_event(EventKind::HeartbeatFailed, &self.identity, Some(&reason));
                    if failures >= self.max_failures {
                        return Err(TaskError::Fail {
                            reason: format!("status upload failed {failures} times in a row: {reason}"),
                        });
                    }
                }
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = ctx.cancelled() => return Ok(()),
            }
        }
    }

    /// Uploads one record. Returns the provisioner phase when one is known.
    pub async fn tick(&self) -> Result<Option<NormalizedPhase>, TrackerError> {
        let snapshot = self.state.snapshot();
        let provisioner_status = if self.signals.is_launch_done() {
            self.status
                .job_status(&self.identity, snapshot.job_id)
                .await
                .map_err(|e| TrackerError::PollFailure(e.to_string()))?
        } else {
            None
        };

        let record = StatusRecord {
            tracker_status: snapshot.status,
            provisioner_status: provisioner_status.clone(),
            job_id: snapshot.job_id,
            reason: None,
            updated_at: SystemTime::now(),
        };
        self.files.put_status(&record).await?;
        trace!(
            target: "skytrack::heartbeat",
            job = %self.identity,
            status = ?record.tracker_status,
            provisioner = record.provisioner_status.as_deref().unwrap_or("-"),
            "status uploaded"
        );

        // Unknown statuses stay in the record; readers map them to FAILED.
        Ok(provisioner_status.and_then(|raw| map_status(self.identity.job_launch_type, &raw).ok()))
    }
}
