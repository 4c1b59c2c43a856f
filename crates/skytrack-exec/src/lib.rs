mod error;
pub use error::{LaunchError, LaunchResult};

mod port;
pub use port::{LaunchPort, LaunchRequest};

mod worker;
pub use worker::LaunchWorker;

#[cfg(feature = "proc")]
pub mod proc;
#[cfg(feature = "proc")]
pub use proc::{ProcConfig, ProcessLauncher};

pub mod utils;

pub mod prelude {
    pub use crate::error::{LaunchError, LaunchResult};
    pub use crate::port::{LaunchPort, LaunchRequest};
    pub use crate::worker::LaunchWorker;
}
