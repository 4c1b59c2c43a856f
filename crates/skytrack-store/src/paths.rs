//! Object-store layout.
//!
//! ```text
//! {prefix}/trackers/{tracker}/heartbeat.json
//! {prefix}/trackers/{tracker}/state/<file>
//! {prefix}/registry/{unique_id}.created
//! {prefix}/jobs/{launch_type}/{cluster}/{task}/status.json
//! {prefix}/jobs/{launch_type}/{cluster}/{task}/error.log
//! {prefix}/jobs/{launch_type}/{cluster}/{task}/delete.json
//! ```
//!
//! Every path is a pure function of the job's metadata, so any process can rebuild it.

use skytrack_model::{JobIdentity, RemoteJobMetadata, escape_component};

fn join(prefix: &str, rest: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        rest.to_string()
    } else {
        format!("{prefix}/{rest}")
    }
}

/// Paths owned by one tracker process under one metadata prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerPaths {
    prefix: String,
    tracker: String,
}

impl TrackerPaths {
    pub fn new(prefix: impl Into<String>, tracker: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            tracker: tracker.into(),
        }
    }

    pub fn from_metadata(meta: &RemoteJobMetadata) -> Self {
        Self::new(
            meta.task_metadata_prefix.clone(),
            meta.tracker_hostname.clone(),
        )
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn tracker(&self) -> &str {
        &self.tracker
    }

    fn root(&self) -> String {
        join(&self.prefix, &format!("trackers/{}", escape_component(&self.tracker)))
    }

    pub fn heartbeat(&self) -> String {
        format!("{}/heartbeat.json", self.root())
    }

    /// Directory prefix of the uploaded state bundle, with trailing `/`.
    pub fn state_root(&self) -> String {
        format!("{}/state/", self.root())
    }

    pub fn state_file(&self, relative: &str) -> String {
        format!("{}{}", self.state_root(), relative.trim_start_matches('/'))
    }

    /// Registration marker; shared by all trackers writing under the same prefix.
    pub fn task_marker(&self, unique_id: &str) -> String {
        join(&self.prefix, &format!("registry/{unique_id}.created"))
    }

    pub fn markers_root(&self) -> String {
        join(&self.prefix, "registry/")
    }
}

/// Paths of a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    root: String,
    unique_id: String,
}

impl JobPaths {
    pub fn new(prefix: &str, identity: &JobIdentity) -> Self {
        let root = join(
            prefix,
            &format!(
                "jobs/{}/{}/{}",
                identity.job_launch_type.as_str(),
                escape_component(&identity.cluster_name),
                escape_component(&identity.task_name)
            ),
        );
        Self {
            root,
            unique_id: identity.unique_id(),
        }
    }

    pub fn from_metadata(meta: &RemoteJobMetadata) -> Self {
        Self::new(&meta.task_metadata_prefix, &meta.identity())
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn status(&self) -> String {
        format!("{}/status.json", self.root)
    }

    pub fn error_log(&self) -> String {
        format!("{}/error.log", self.root)
    }

    pub fn delete_marker(&self) -> String {
        format!("{}/delete.json", self.root)
    }
}
