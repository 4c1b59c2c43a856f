use thiserror::Error;

/// Failure to install the tracker's log subscriber.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?}, expected text, json or journald")]
    InvalidFormat(String),

    #[error("journald output unavailable: {0}")]
    JournaldUnavailable(String),

    #[error("a global log subscriber is already installed")]
    AlreadyInitialized,

    #[error("log subscriber could not be installed: {0}")]
    Install(String),

    #[error("bad log directive {directive:?}: {reason}")]
    InvalidLevel { directive: String, reason: String },
}
