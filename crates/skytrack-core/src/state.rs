use std::sync::{Mutex, PoisonError};

use skytrack_model::{JobId, TaskStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    pub status: TaskStatus,
    pub job_id: Option<JobId>,
}

/// Tracker-side status of one job.
///
/// Transitions only move forward; `Done` is entered exactly once.
#[derive(Debug, Default)]
pub struct StateCell {
    inner: Mutex<StateSnapshot>,
}

impl StateCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> TaskStatus {
        self.snapshot().status
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.snapshot().job_id
    }

    /// Moves to `next` if it is ahead of the current status.
    pub fn advance(&self, next: TaskStatus) -> bool {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.status.can_advance_to(next) {
            guard.status = next;
            true
        } else {
            false
        }
    }

    /// Records the provisioner job id and moves to `Running`.
    pub fn launched(&self, job_id: JobId) -> bool {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.status.is_done() {
            return false;
        }
        guard.job_id = Some(job_id);
        if guard.status.can_advance_to(TaskStatus::Running) {
            guard.status = TaskStatus::Running;
        }
        true
    }

    /// Enters `Done`. Returns `true` only for the caller that performed the transition.
    pub fn mark_done(&self) -> bool {
        self.advance(TaskStatus::Done)
    }
}
