use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use tracing::warn;

use skytrack_model::RemoteJobMetadata;
use skytrack_store::{ObjectStore, RemotePathRegistry, TrackerPaths};

/// Decides whether the tracker that owns a job is still publishing heartbeats.
#[derive(Clone)]
pub struct LivenessMonitor {
    store: Arc<dyn ObjectStore>,
    threshold: Duration,
}

impl LivenessMonitor {
    pub fn new(store: Arc<dyn ObjectStore>, threshold: Duration) -> Self {
        Self { store, threshold }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub async fn is_alive(&self, meta: &RemoteJobMetadata) -> bool {
        self.is_alive_at(meta, SystemTime::now()).await
    }

    /// A tracker with no heartbeat, or an unreadable one, counts as dead.
    pub async fn is_alive_at(&self, meta: &RemoteJobMetadata, now: SystemTime) -> bool {
        let registry =
            RemotePathRegistry::new(Arc::clone(&self.store), TrackerPaths::from_metadata(meta));
        match registry.last_heartbeat().await {
            Ok(last) => heartbeat_fresh(last, now, self.threshold),
            Err(e) => {
                warn!(
                    target: "skytrack::liveness",
                    tracker = %meta.tracker_hostname,
                    error = %e,
                    "unreadable tracker heartbeat"
                );
                false
            }
        }
    }
}

/// A heartbeat stamped after `now` is treated as fresh.
pub fn heartbeat_fresh(last: Option<SystemTime>, now: SystemTime, threshold: Duration) -> bool {
    match last {
        None => false,
        Some(at) => match now.duration_since(at) {
            Ok(age) => age <= threshold,
            Err(_) => true,
        },
    }
}
