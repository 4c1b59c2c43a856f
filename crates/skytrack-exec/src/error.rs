use thiserror::Error;

use skytrack_model::JobId;

pub type LaunchResult = Result<JobId, LaunchError>;

/// Why a launch did not produce a job id.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("launcher exited with code {code}")]
    NonZeroExit { code: i32, stderr: String },
    #[error("launcher killed by signal")]
    KilledBySignal { stderr: String },
    #[error("launcher output is not a job id: {0}")]
    InvalidOutput(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("provisioner error: {message}")]
    Provisioner {
        message: String,
        trace: Option<String>,
    },
    #[error("launch worker panicked: {0}")]
    WorkerPanicked(String),
    #[error("launch worker terminated")]
    Terminated,
}

impl LaunchError {
    /// Textual trace captured on the far side of the isolation boundary, if any.
    pub fn trace(&self) -> Option<&str> {
        match self {
            LaunchError::NonZeroExit { stderr, .. } | LaunchError::KilledBySignal { stderr } => {
                Some(stderr.as_str()).filter(|s| !s.is_empty())
            }
            LaunchError::Provisioner { trace, .. } => trace.as_deref(),
            _ => None,
        }
    }

    /// Message plus trace, as written to the job's error log.
    pub fn report(&self) -> String {
        match self.trace() {
            Some(trace) => format!("{self}\n{trace}"),
            None => self.to_string(),
        }
    }
}

impl From<std::io::Error> for LaunchError {
    fn from(e: std::io::Error) -> Self {
        LaunchError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_includes_trace() {
        let err = LaunchError::NonZeroExit {
            code: 2,
            stderr: "Traceback: quota exceeded".into(),
        };
        assert_eq!(err.report(), "launcher exited with code 2\nTraceback: quota exceeded");
    }

    #[test]
    fn empty_stderr_is_not_a_trace() {
        let err = LaunchError::KilledBySignal { stderr: String::new() };
        assert!(err.trace().is_none());
        assert_eq!(err.report(), "launcher killed by signal");
    }
}
