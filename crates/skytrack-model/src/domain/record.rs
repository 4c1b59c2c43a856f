use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::{JobId, TaskStatus};

/// Content of a job's status file, rewritten on every heartbeat tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    /// Controller state of the owning tracker.
    pub tracker_status: TaskStatus,
    /// Raw provisioner status; `None` until the provisioner reports the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioner_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    /// Why the tracker stopped; set only on the closing record of a cancelled or failed job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(with = "crate::domain::time_serde")]
    pub updated_at: SystemTime,
}

/// Tracker-level liveness marker written by the state sync task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerHeartbeat {
    pub tracker_hostname: String,
    #[serde(with = "crate::domain::time_serde")]
    pub uploaded_at: SystemTime,
    /// Number of state files uploaded with this heartbeat.
    #[serde(default)]
    pub files: u32,
}
