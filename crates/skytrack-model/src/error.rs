use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown job launch type: {0} (expected: managed|interactive)")]
    UnknownLaunchType(String),

    #[error("unknown {launch_type} provisioner status: {value}")]
    UnknownStatus { launch_type: String, value: String },

    #[error("invalid job spec: {0}")]
    InvalidSpec(String),
}
