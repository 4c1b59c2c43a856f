use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// Shared signal flags of one job.
///
/// Any of `failed`, `cancel` or `finished` makes the job terminal; the first one to flip
/// cancels [`EventSignals::token`], which every supervised task of the job observes.
#[derive(Debug, Default)]
pub struct EventSignals {
    launch_done: AtomicBool,
    failed: AtomicBool,
    cancel: AtomicBool,
    finished: AtomicBool,
    terminal: CancellationToken,
}

impl EventSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled once the job is terminal.
    pub fn token(&self) -> CancellationToken {
        self.terminal.clone()
    }

    pub fn is_launch_done(&self) -> bool {
        self.launch_done.load(Ordering::Acquire)
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_failed() || self.is_cancelled() || self.is_finished()
    }

    pub fn set_launch_done(&self) {
        self.launch_done.store(true, Ordering::Release);
    }

    pub fn set_failed(&self) {
        self.failed.store(true, Ordering::Release);
        self.terminal.cancel();
    }

    pub fn set_cancel(&self) {
        self.cancel.store(true, Ordering::Release);
        self.terminal.cancel();
    }

    pub fn set_finished(&self) {
        self.finished.store(true, Ordering::Release);
        self.terminal.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_done_is_not_terminal() {
        let s = EventSignals::new();
        s.set_launch_done();
        assert!(s.is_launch_done());
        assert!(!s.is_terminal());
        assert!(!s.token().is_cancelled());
    }

    #[test]
    fn each_terminal_flag_cancels_the_token() {
        for set in [
            EventSignals::set_failed as fn(&EventSignals),
            EventSignals::set_cancel,
            EventSignals::set_finished,
        ] {
            let s = EventSignals::new();
            let token = s.token();
            set(&s);
            assert!(s.is_terminal());
            assert!(token.is_cancelled());
        }
    }
}
