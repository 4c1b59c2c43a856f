use std::{sync::Arc, time::Duration};

use taskvisor::{TaskError, TaskFn, TaskRef};
use tokio_util::sync::CancellationToken;

use skytrack_model::JobIdentity;
use skytrack_store::JobFiles;

use crate::{
    events::{EventKind, log_event},
    signals::EventSignals,
};

pub(crate) const DELETION_STATUS: &str = "deletion-status";

/// Watches for the job's deletion marker and raises `cancel` when it shows up.
pub struct DeletionWatcher {
    identity: JobIdentity,
    files: JobFiles,
    signals: Arc<EventSignals>,
    interval: Duration,
    max_failures: u32,
}

impl DeletionWatcher {
    pub fn new(
        identity: JobIdentity,
        files: JobFiles,
        signals: Arc<EventSignals>,
        interval: Duration,
        max_failures: u32,
    ) -> Self {
        Self {
            identity,
            files,
            signals,
            interval,
            max_failures: max_failures.max(1),
        }
    }

    pub fn into_task(self) -> TaskRef {
        let watcher = Arc::new(self);
        TaskFn::arc(DELETION_STATUS, move |ctx: CancellationToken| {
            let watcher = Arc::clone(&watcher);
            async move { watcher.run(ctx).await }
        })
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        let mut failures = 0u32;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = ctx.cancelled() => return Ok(()),
            }
            match self.files.deletion_requested().await {
                Ok(true) => {
                    log_event(EventKind::DeletionObserved, &self.identity, None);
                    self.signals.set_cancel();
                    return Ok(());
                }
                Ok(false) => failures = 0,
                Err(e) => {
                    failures += 1;
                    if failures >= self.max_failures {
                        return Err(TaskError::Fail {
                            reason: format!("deletion marker unreadable: {e}"),
                        });
                    }
                }
            }
        }
    }
}
