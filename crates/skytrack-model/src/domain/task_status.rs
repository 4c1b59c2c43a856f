use serde::{Deserialize, Serialize};

/// Lifecycle state of a tracker controller.
///
/// Ordered: a controller only ever moves forward, and `Done` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Init,
    Launching,
    Running,
    Done,
}

impl TaskStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }

    /// Returns `true` if moving to `next` keeps the sequence monotonic.
    pub fn can_advance_to(&self, next: TaskStatus) -> bool {
        !self.is_done() && next > *self
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Init
    }
}
