use std::fmt;

use serde::{Deserialize, Serialize};

/// Job state as exposed to the orchestration host, independent of the provisioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NormalizedPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Aborted,
}

impl NormalizedPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NormalizedPhase::Succeeded | NormalizedPhase::Failed | NormalizedPhase::Aborted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizedPhase::Pending => "PENDING",
            NormalizedPhase::Running => "RUNNING",
            NormalizedPhase::Succeeded => "SUCCEEDED",
            NormalizedPhase::Failed => "FAILED",
            NormalizedPhase::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for NormalizedPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
