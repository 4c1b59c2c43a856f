//! Create / Get / Delete boundary of the remote-job tracker.

mod config;
pub use config::{AgentConfig, ConfigError, StoreConfig};

mod error;
pub use error::AgentError;

mod handler;
pub use handler::AgentHandler;

mod agent;
pub use agent::TrackerAgent;

mod remote;
