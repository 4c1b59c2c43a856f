use serde::{Deserialize, Serialize};

use crate::{JobIdentity, JobLaunchType};

/// Record handed back by `create` and passed to every later `get`/`delete`.
///
/// Immutable after creation. Every object-store path of the job can be rebuilt from it alone,
/// which is what lets another process query or delete the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteJobMetadata {
    pub job_name: String,
    pub cluster_name: String,
    /// Object-store root of all bookkeeping files.
    pub task_metadata_prefix: String,
    /// Identity of the tracker process that owns the job.
    pub tracker_hostname: String,
    pub job_launch_type: JobLaunchType,
}

impl RemoteJobMetadata {
    pub fn identity(&self) -> JobIdentity {
        JobIdentity::new(
            self.cluster_name.clone(),
            self.job_name.clone(),
            self.job_launch_type,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_wire_shape() {
        let meta = RemoteJobMetadata {
            job_name: "train".into(),
            cluster_name: "c1".into(),
            task_metadata_prefix: "bucket/raw".into(),
            tracker_hostname: "agent-0".into(),
            job_launch_type: JobLaunchType::Interactive,
        };

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["jobName"], "train");
        assert_eq!(json["taskMetadataPrefix"], "bucket/raw");
        assert_eq!(json["jobLaunchType"], "INTERACTIVE");

        let back: RemoteJobMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back.identity(), JobIdentity::new("c1", "train", JobLaunchType::Interactive));
    }
}
