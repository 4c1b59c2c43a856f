use crate::NormalizedPhase;

/// Status of a job run by the managed jobs controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagedStatus {
    Pending,
    Submitted,
    Starting,
    Running,
    Recovering,
    Cancelling,
    Succeeded,
    Cancelled,
    Failed,
    FailedSetup,
    FailedPrechecks,
    FailedNoResource,
    FailedController,
}

impl ManagedStatus {
    pub const ALL: &'static [ManagedStatus] = &[
        ManagedStatus::Pending,
        ManagedStatus::Submitted,
        ManagedStatus::Starting,
        ManagedStatus::Running,
        ManagedStatus::Recovering,
        ManagedStatus::Cancelling,
        ManagedStatus::Succeeded,
        ManagedStatus::Cancelled,
        ManagedStatus::Failed,
        ManagedStatus::FailedSetup,
        ManagedStatus::FailedPrechecks,
        ManagedStatus::FailedNoResource,
        ManagedStatus::FailedController,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ManagedStatus::Pending => "PENDING",
            ManagedStatus::Submitted => "SUBMITTED",
            ManagedStatus::Starting => "STARTING",
            ManagedStatus::Running => "RUNNING",
            ManagedStatus::Recovering => "RECOVERING",
            ManagedStatus::Cancelling => "CANCELLING",
            ManagedStatus::Succeeded => "SUCCEEDED",
            ManagedStatus::Cancelled => "CANCELLED",
            ManagedStatus::Failed => "FAILED",
            ManagedStatus::FailedSetup => "FAILED_SETUP",
            ManagedStatus::FailedPrechecks => "FAILED_PRECHECKS",
            ManagedStatus::FailedNoResource => "FAILED_NO_RESOURCE",
            ManagedStatus::FailedController => "FAILED_CONTROLLER",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }

    pub fn phase(&self) -> NormalizedPhase {
        match self {
            ManagedStatus::Pending | ManagedStatus::Submitted => NormalizedPhase::Pending,
            ManagedStatus::Starting | ManagedStatus::Running | ManagedStatus::Recovering => {
                NormalizedPhase::Running
            }
            ManagedStatus::Succeeded => NormalizedPhase::Succeeded,
            ManagedStatus::Cancelling | ManagedStatus::Cancelled => NormalizedPhase::Aborted,
            ManagedStatus::Failed
            | ManagedStatus::FailedSetup
            | ManagedStatus::FailedPrechecks
            | ManagedStatus::FailedNoResource
            | ManagedStatus::FailedController => NormalizedPhase::Failed,
        }
    }
}
