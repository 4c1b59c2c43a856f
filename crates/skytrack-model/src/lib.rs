//! Shared data model of the remote-job tracker.
//!
//! Everything here is plain data: identities, persisted records and the provisioner status vocabularies.
//! The types are serialized across process boundaries, so their serde shape is part of the contract.

mod error;
pub use error::ModelError;

mod domain;
pub use domain::*;

mod provisioner;
pub use provisioner::{InteractiveStatus, ManagedStatus, ProvisionerStatus};
