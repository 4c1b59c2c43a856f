use serde::{Deserialize, Serialize};

use crate::{JobIdentity, JobLaunchType, ModelError};

/// What the host asks the tracker to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub task_name: String,
    /// Target cluster for interactive launches; ignored for managed ones.
    #[serde(default)]
    pub cluster_name: String,
    pub job_launch_type: JobLaunchType,
    pub task_metadata_prefix: String,
    /// Provisioner task configuration, forwarded verbatim to the launcher.
    #[serde(default)]
    pub resources: serde_json::Value,
    /// Idle minutes before the provisioner stops the cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_after_minutes: Option<u32>,
    /// Tear the cluster down instead of stopping it on autostop.
    #[serde(default)]
    pub auto_down: bool,
}

impl JobSpec {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.task_name.trim().is_empty() {
            return Err(ModelError::InvalidSpec("task name is empty".into()));
        }
        if self.task_metadata_prefix.trim().is_empty() {
            return Err(ModelError::InvalidSpec("task metadata prefix is empty".into()));
        }
        if self.job_launch_type == JobLaunchType::Interactive && self.cluster_name.trim().is_empty()
        {
            return Err(ModelError::InvalidSpec(
                "interactive jobs require a cluster name".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the identity; managed jobs always land on the shared controller cluster.
    pub fn identity(&self, managed_cluster_name: &str) -> JobIdentity {
        let cluster = match self.job_launch_type {
            JobLaunchType::Managed => managed_cluster_name.to_string(),
            JobLaunchType::Interactive => self.cluster_name.clone(),
        };
        JobIdentity::new(cluster, self.task_name.clone(), self.job_launch_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: JobLaunchType, cluster: &str) -> JobSpec {
        JobSpec {
            task_name: "train".into(),
            cluster_name: cluster.into(),
            job_launch_type: kind,
            task_metadata_prefix: "bucket/raw".into(),
            resources: serde_json::Value::Null,
            stop_after_minutes: None,
            auto_down: false,
        }
    }

    #[test]
    fn managed_identity_uses_controller_cluster() {
        let id = spec(JobLaunchType::Managed, "user-cluster").identity("sky-jobs-controller");
        assert_eq!(id.cluster_name, "sky-jobs-controller");
    }

    #[test]
    fn interactive_identity_keeps_cluster() {
        let id = spec(JobLaunchType::Interactive, "c1").identity("sky-jobs-controller");
        assert_eq!(id.cluster_name, "c1");
    }

    #[test]
    fn interactive_without_cluster_is_rejected() {
        assert!(spec(JobLaunchType::Interactive, " ").validate().is_err());
        assert!(spec(JobLaunchType::Managed, "").validate().is_ok());
    }

    #[test]
    fn deserializes_with_defaults() {
        let spec: JobSpec = serde_json::from_str(
            r#"{"taskName":"t","jobLaunchType":"MANAGED","taskMetadataPrefix":"p"}"#,
        )
        .unwrap();
        assert!(spec.cluster_name.is_empty());
        assert!(!spec.auto_down);
        assert!(spec.resources.is_null());
    }
}
