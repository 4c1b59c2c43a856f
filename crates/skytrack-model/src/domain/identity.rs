use std::{
    fmt::{self, Write as _},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Which provisioner API a job is launched through.
///
/// `Managed` jobs run on a shared jobs-controller cluster, `Interactive` jobs on a user-named cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobLaunchType {
    Managed,
    Interactive,
}

impl JobLaunchType {
    /// Lowercase name used in object-store paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobLaunchType::Managed => "managed",
            JobLaunchType::Interactive => "interactive",
        }
    }
}

impl fmt::Display for JobLaunchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobLaunchType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "managed" => Ok(JobLaunchType::Managed),
            "interactive" => Ok(JobLaunchType::Interactive),
            _ => Err(ModelError::UnknownLaunchType(s.to_string())),
        }
    }
}

/// Address of exactly one remote job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobIdentity {
    pub cluster_name: String,
    pub task_name: String,
    pub job_launch_type: JobLaunchType,
}

impl JobIdentity {
    pub fn new(
        cluster_name: impl Into<String>,
        task_name: impl Into<String>,
        job_launch_type: JobLaunchType,
    ) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            task_name: task_name.into(),
            job_launch_type,
        }
    }

    /// Stable flat identifier, used for the registration marker.
    ///
    /// `-` is escaped inside components so distinct identities never share an id.
    pub fn unique_id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.job_launch_type.as_str(),
            escape(&self.cluster_name, &['-']),
            escape(&self.task_name, &['-'])
        )
    }
}

impl fmt::Display for JobIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.job_launch_type, self.cluster_name, self.task_name
        )
    }
}

/// Percent-escape a name into a single object-store path component.
///
/// Distinct names always map to distinct components.
pub fn escape_component(name: &str) -> String {
    escape(name, &[])
}

fn escape(name: &str, reserved: &[char]) -> String {
    if name == "." || name == ".." {
        return name.replace('.', "%2E");
    }
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c == '%' || c == '/' || c.is_whitespace() || c.is_control() || reserved.contains(&c) {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                let _ = write!(out, "%{byte:02X}");
            }
        } else {
            out.push(c);
        }
    }
    out
}
