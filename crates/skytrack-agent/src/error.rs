use thiserror::Error;

use skytrack_core::TrackerError;
use skytrack_observe::LoggerError;
use skytrack_store::StoreError;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("object store error: {0}")]
    Store(#[from] StoreError),

    #[error("logger error: {0}")]
    Logger(#[from] LoggerError),
}
