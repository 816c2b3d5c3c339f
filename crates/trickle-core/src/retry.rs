//! Bounded retry with a fixed delay between attempts
//!
//! Transient failures (per [`Retryable`]) are retried until the policy's
//! attempt budget is spent; anything else propagates on first occurrence.
//! The attempt counter lives in each call, never in the policy, so one
//! policy can back any number of wrapped operations.

use std::fmt;
use std::time::Duration;

use crate::error::{InvalidPolicy, Retryable};
use crate::pause::{Pause, PauseOutcome, ThreadPause};

/// Immutable retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Policy allowing up to `max_attempts` invocations (at least 1),
    /// pausing `delay` between them.
    pub const fn new(max_attempts: u32, delay: Duration) -> Result<Self, InvalidPolicy> {
        if max_attempts == 0 {
            return Err(InvalidPolicy { max_attempts });
        }
        Ok(Self {
            max_attempts,
            delay,
        })
    }

    /// Single attempt, no retries.
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// A transient failure that will be retried.
pub struct RetryNotice<'a> {
    pub operation: &'a str,
    /// Attempt budget of the policy in force.
    pub max_attempts: u32,
    /// Attempts still available after this failure.
    pub remaining: u32,
    pub cause: &'a dyn fmt::Display,
    /// Pause about to be taken before the next attempt.
    pub delay: Duration,
}

impl fmt::Display for RetryNotice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[retry] {} failed (attempts left: {}, error: {}). Retrying in {:?}...",
            self.operation, self.remaining, self.cause, self.delay
        )
    }
}

/// The attempt budget ran out.
pub struct ExhaustedNotice<'a> {
    pub operation: &'a str,
    pub attempts: u32,
    pub cause: &'a dyn fmt::Display,
}

impl fmt::Display for ExhaustedNotice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[retry] {} failed after {} attempts. Last error: {}",
            self.operation, self.attempts, self.cause
        )
    }
}

/// Sink for retry notices.
pub trait Notifier {
    /// One call per transient failure that will be retried.
    fn warn(&self, notice: &RetryNotice<'_>);

    /// One call when the attempt budget is exhausted.
    fn error(&self, notice: &ExhaustedNotice<'_>);
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn warn(&self, notice: &RetryNotice<'_>) {
        (**self).warn(notice);
    }

    fn error(&self, notice: &ExhaustedNotice<'_>) {
        (**self).error(notice);
    }
}

/// Forwards notices to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn warn(&self, notice: &RetryNotice<'_>) {
        log::warn!("{notice}");
    }

    fn error(&self, notice: &ExhaustedNotice<'_>) {
        log::error!("{notice}");
    }
}

/// Run `attempt_fn` under `policy`.
///
/// Returns the first success, the first non-retryable error, or the last
/// retryable error once `max_attempts` invocations have failed. Errors are
/// returned unchanged. If the pause is cancelled the last error is returned
/// without another invocation.
pub fn retry<T, E, N, P>(
    operation: &str,
    policy: RetryPolicy,
    notifier: &N,
    pause: &P,
    mut attempt_fn: impl FnMut() -> Result<T, E>,
) -> Result<T, E>
where
    E: Retryable + fmt::Display,
    N: Notifier + ?Sized,
    P: Pause + ?Sized,
{
    let max_attempts = policy.max_attempts();
    let mut remaining = max_attempts;
    loop {
        log::debug!(
            "[retry] {operation}: attempt {}/{max_attempts}",
            max_attempts - remaining + 1
        );
        let e = match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        if !e.is_retryable() {
            log::debug!("[retry] {operation}: non-transient failure, not retrying: {e}");
            return Err(e);
        }
        remaining -= 1;
        if remaining == 0 {
            notifier.error(&ExhaustedNotice {
                operation,
                attempts: max_attempts,
                cause: &e,
            });
            return Err(e);
        }
        notifier.warn(&RetryNotice {
            operation,
            max_attempts,
            remaining,
            cause: &e,
            delay: policy.delay(),
        });
        if pause.pause(policy.delay()) == PauseOutcome::Cancelled {
            log::info!(
                "[retry] {operation}: cancelled while waiting, giving up after {} attempts",
                max_attempts - remaining
            );
            return Err(e);
        }
    }
}

/// A named operation bound to a retry policy.
///
/// Created by [`wrap`]. The name is kept for diagnostics only; each
/// [`call`](Self::call) starts a fresh attempt budget.
pub struct Retrying<F, N = LogNotifier, P = ThreadPause> {
    name: String,
    operation: F,
    policy: RetryPolicy,
    notifier: N,
    pause: P,
}

/// Bind `operation` to `policy`, logging notices and sleeping on the
/// current thread between attempts.
pub fn wrap<F>(name: impl Into<String>, operation: F, policy: RetryPolicy) -> Retrying<F> {
    Retrying {
        name: name.into(),
        operation,
        policy,
        notifier: LogNotifier,
        pause: ThreadPause::default(),
    }
}

impl<F, N, P> Retrying<F, N, P> {
    /// Replace the notice sink.
    pub fn with_notifier<M>(self, notifier: M) -> Retrying<F, M, P> {
        Retrying {
            name: self.name,
            operation: self.operation,
            policy: self.policy,
            notifier,
            pause: self.pause,
        }
    }

    /// Replace the between-attempt pause.
    pub fn with_pause<Q>(self, pause: Q) -> Retrying<F, N, Q> {
        Retrying {
            name: self.name,
            operation: self.operation,
            policy: self.policy,
            notifier: self.notifier,
            pause,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Invoke the operation with `args`, re-invoking with the same
    /// arguments on transient failure.
    pub fn call<A, T, E>(&mut self, args: &A) -> Result<T, E>
    where
        A: ?Sized,
        F: FnMut(&A) -> Result<T, E>,
        E: Retryable + fmt::Display,
        N: Notifier,
        P: Pause,
    {
        let Self {
            name,
            operation,
            policy,
            notifier,
            pause,
        } = self;
        retry(name.as_str(), *policy, &*notifier, &*pause, || operation(args))
    }
}

impl<F, N: fmt::Debug, P: fmt::Debug> fmt::Debug for Retrying<F, N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrying")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("notifier", &self.notifier)
            .field("pause", &self.pause)
            .finish_non_exhaustive()
    }
}
