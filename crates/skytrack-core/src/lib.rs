//! Remote-job lifecycle tracking.
//!
//! A [`TaskLifecycleController`] supervises one job: the isolated launch, a deletion-status
//! poller and the heartbeat publisher. The [`TaskRegistry`] indexes controllers per process
//! and decides when a cluster can be stopped.

pub mod config;
pub use config::{ConfigError, TrackerConfig};

mod error;
pub use error::{PortError, TrackerError};

pub mod events;

mod ports;
pub use ports::{DeprovisionPort, Ports, StatusPort};

mod system;
pub use system::tracker_id;

mod signals;
pub use signals::EventSignals;

mod state;
pub use state::{StateCell, StateSnapshot};

pub mod liveness;
pub use liveness::LivenessMonitor;

pub mod poller;
pub use poller::{PhaseReport, StatusPoller};

mod heartbeat;
pub use heartbeat::HeartbeatPublisher;

mod deletion;
pub use deletion::DeletionWatcher;

mod controller;
pub use controller::{TaskLifecycleController, TeardownHook};

mod sync;
pub use sync::{StateSync, restore_state};

mod registry;
pub use registry::TaskRegistry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
