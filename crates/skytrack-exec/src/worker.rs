use std::{any::Any, sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{LaunchError, LaunchPort, LaunchRequest, LaunchResult};

/// A launch running on its own task, isolated from the controller.
///
/// The outcome crosses back as a typed `LaunchResult`; a panic inside the launcher
/// becomes [`LaunchError::WorkerPanicked`] instead of taking the caller down.
/// Dropping the worker aborts it.
pub struct LaunchWorker {
    name: &'static str,
    handle: Option<JoinHandle<LaunchResult>>,
}

impl LaunchWorker {
    pub fn spawn(port: Arc<dyn LaunchPort>, request: LaunchRequest) -> Self {
        let name = port.name();
        trace!(target: "skytrack::launch", launcher = name, job = %request.identity, "spawn worker");
        let handle = tokio::spawn(async move { port.launch(&request).await });
        Self {
            name,
            handle: Some(handle),
        }
    }

    /// Non-blocking liveness check.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Wait for the worker and collect its result.
    pub async fn outcome(&mut self) -> LaunchResult {
        let Some(handle) = self.handle.take() else {
            return Err(LaunchError::Terminated);
        };
        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(LaunchError::WorkerPanicked(panic_message(e.into_panic()))),
            Err(_) => Err(LaunchError::Terminated),
        }
    }

    /// Kill the worker and wait until its resources are released.
    pub async fn terminate(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
            debug!(target: "skytrack::launch", launcher = self.name, "worker terminated");
        }
    }

    /// Poll the worker every `interval` until it finishes or `ctx` is cancelled.
    ///
    /// Returns `Ok(None)` when the worker was terminated because of `ctx`.
    pub async fn supervise(
        mut self,
        interval: Duration,
        ctx: &CancellationToken,
    ) -> Result<Option<skytrack_model::JobId>, LaunchError> {
        loop {
            if self.is_finished() {
                return self.outcome().await.map(Some);
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = ctx.cancelled() => {
                    self.terminate().await;
                    return Ok(None);
                }
            }
        }
    }
}

impl Drop for LaunchWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
