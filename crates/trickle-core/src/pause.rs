//! Blocking pauses between retry attempts

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::shutdown::shutdown_flag;

/// Granularity at which a sleeping pause re-checks its cancel flag.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// How a pause ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    Completed,
    Cancelled,
}

/// Blocks the calling flow between attempts.
pub trait Pause {
    fn pause(&self, delay: Duration) -> PauseOutcome;
}

impl<T: Pause + ?Sized> Pause for &T {
    fn pause(&self, delay: Duration) -> PauseOutcome {
        (**self).pause(delay)
    }
}

/// Sleeps on the current thread, waking early if the cancel flag is set.
///
/// A zero delay does not sleep at all, but a set flag still cancels it.
#[derive(Debug, Clone, Copy)]
pub struct ThreadPause {
    cancel: &'static AtomicBool,
    poll: Duration,
}

impl ThreadPause {
    /// Pause cancelled by an arbitrary flag instead of the process one.
    pub const fn with_flag(cancel: &'static AtomicBool) -> Self {
        Self {
            cancel,
            poll: CANCEL_POLL,
        }
    }
}

impl Default for ThreadPause {
    fn default() -> Self {
        Self::with_flag(shutdown_flag())
    }
}

impl Pause for ThreadPause {
    fn pause(&self, delay: Duration) -> PauseOutcome {
        if self.cancel.load(Ordering::Relaxed) {
            return PauseOutcome::Cancelled;
        }
        // A delay past what `Instant` can represent only ends by cancellation
        let deadline = Instant::now().checked_add(delay);
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                return PauseOutcome::Cancelled;
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return PauseOutcome::Completed;
                    }
                    self.poll.min(deadline - now)
                }
                None => self.poll,
            };
            std::thread::sleep(slice);
        }
    }
}

/// Never sleeps and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantPause;

impl Pause for InstantPause {
    fn pause(&self, _delay: Duration) -> PauseOutcome {
        PauseOutcome::Completed
    }
}
