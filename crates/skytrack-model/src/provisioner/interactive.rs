use crate::NormalizedPhase;

/// Job status reported by an interactive cluster's job queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractiveStatus {
    Init,
    Pending,
    SettingUp,
    Running,
    Succeeded,
    Failed,
    FailedSetup,
    FailedDriver,
    Cancelled,
}

impl InteractiveStatus {
    pub const ALL: &'static [InteractiveStatus] = &[
        InteractiveStatus::Init,
        InteractiveStatus::Pending,
        InteractiveStatus::SettingUp,
        InteractiveStatus::Running,
        InteractiveStatus::Succeeded,
        InteractiveStatus::Failed,
        InteractiveStatus::FailedSetup,
        InteractiveStatus::FailedDriver,
        InteractiveStatus::Cancelled,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InteractiveStatus::Init => "INIT",
            InteractiveStatus::Pending => "PENDING",
            InteractiveStatus::SettingUp => "SETTING_UP",
            InteractiveStatus::Running => "RUNNING",
            InteractiveStatus::Succeeded => "SUCCEEDED",
            InteractiveStatus::Failed => "FAILED",
            InteractiveStatus::FailedSetup => "FAILED_SETUP",
            InteractiveStatus::FailedDriver => "FAILED_DRIVER",
            InteractiveStatus::Cancelled => "CANCELLED",
        }
    }

    /// Expects an already upper-cased name.
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }

    pub fn phase(&self) -> NormalizedPhase {
        match self {
            InteractiveStatus::Init | InteractiveStatus::Pending => NormalizedPhase::Pending,
            InteractiveStatus::SettingUp | InteractiveStatus::Running => NormalizedPhase::Running,
            InteractiveStatus::Succeeded => NormalizedPhase::Succeeded,
            InteractiveStatus::Failed
            | InteractiveStatus::FailedSetup
            | InteractiveStatus::FailedDriver => NormalizedPhase::Failed,
            InteractiveStatus::Cancelled => NormalizedPhase::Aborted,
        }
    }
}
