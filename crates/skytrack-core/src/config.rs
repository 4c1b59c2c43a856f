use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use skytrack_model::DurationMs;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid tracker config: {0}")]
    Invalid(String),
}

/// Timing and layout knobs of a tracker process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Scheduling interval of launch supervision and deletion polling.
    pub poll_interval_ms: DurationMs,
    /// Interval between status uploads.
    pub heartbeat_interval_ms: DurationMs,
    /// Maximum heartbeat age before a tracker is presumed dead.
    ///
    /// Matches the provisioner's idle autostop window of its jobs controller (10 minutes).
    pub staleness_threshold_ms: DurationMs,
    /// Consecutive failed uploads tolerated before the publisher gives up.
    pub max_heartbeat_failures: u32,
    /// Interval of the tracker-wide state sync / heartbeat.
    pub sync_interval_ms: DurationMs,
    /// Local provisioner state bundled for remote liveness checks and out-of-band teardown.
    pub state_dir: Option<PathBuf>,
    /// Cluster hosting managed jobs.
    pub managed_cluster_name: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            heartbeat_interval_ms: 5_000,
            staleness_threshold_ms: 600_000,
            max_heartbeat_failures: 3,
            sync_interval_ms: 10_000,
            state_dir: None,
            managed_cluster_name: "sky-jobs-controller".to_string(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("poll_interval_ms", self.poll_interval_ms),
            ("heartbeat_interval_ms", self.heartbeat_interval_ms),
            ("staleness_threshold_ms", self.staleness_threshold_ms),
            ("sync_interval_ms", self.sync_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        if self.max_heartbeat_failures == 0 {
            return Err(ConfigError::Invalid(
                "max_heartbeat_failures must be at least 1".into(),
            ));
        }
        if self.managed_cluster_name.trim().is_empty() {
            return Err(ConfigError::Invalid("managed_cluster_name is empty".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_millis(self.staleness_threshold_ms)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }
}
