//! Provisioner status vocabularies.
//!
//! Managed and interactive jobs expose different status enumerations.
//! Each variant maps to exactly one [`NormalizedPhase`]; anything else is an [`ModelError::UnknownStatus`].

mod interactive;
pub use interactive::InteractiveStatus;

mod managed;
pub use managed::ManagedStatus;

use crate::{JobLaunchType, ModelError, NormalizedPhase};

/// A parsed provisioner status, tagged by the API it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionerStatus {
    Managed(ManagedStatus),
    Interactive(InteractiveStatus),
}

impl ProvisionerStatus {
    /// Parse a raw status string using the vocabulary of `launch_type`.
    pub fn parse(launch_type: JobLaunchType, raw: &str) -> Result<Self, ModelError> {
        let norm = raw.trim().to_ascii_uppercase();
        let parsed = match launch_type {
            JobLaunchType::Managed => ManagedStatus::from_name(&norm).map(ProvisionerStatus::Managed),
            JobLaunchType::Interactive => {
                InteractiveStatus::from_name(&norm).map(ProvisionerStatus::Interactive)
            }
        };
        parsed.ok_or_else(|| ModelError::UnknownStatus {
            launch_type: launch_type.as_str().to_string(),
            value: raw.to_string(),
        })
    }

    pub fn phase(&self) -> NormalizedPhase {
        match self {
            ProvisionerStatus::Managed(s) => s.phase(),
            ProvisionerStatus::Interactive(s) => s.phase(),
        }
    }
}
