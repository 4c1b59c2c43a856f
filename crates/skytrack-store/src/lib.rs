//! Shared object store and the deterministic layout of tracker bookkeeping files.

mod error;
pub use error::StoreError;

mod store;
pub use store::{MemoryStore, ObjectStore, get_json, put_json};

mod local;
pub use local::LocalStore;

mod paths;
pub use paths::{JobPaths, TrackerPaths};

mod registry;
pub use registry::{JobFiles, RemotePathRegistry};
