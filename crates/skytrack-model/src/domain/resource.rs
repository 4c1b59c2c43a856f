use serde::{Deserialize, Serialize};

use crate::NormalizedPhase;

/// Answer to a `get` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResource {
    pub phase: NormalizedPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobResource {
    pub fn new(phase: NormalizedPhase) -> Self {
        Self {
            phase,
            outputs: None,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            phase: NormalizedPhase::Failed,
            outputs: None,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_outputs(mut self, outputs: impl Into<String>) -> Self {
        self.outputs = Some(outputs.into());
        self
    }
}
