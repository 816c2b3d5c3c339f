//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: spinner lines for running stages and retried operations.
//! Non-TTY mode: hidden bars, log output only.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::retry::{ExhaustedNotice, Notifier, RetryNotice};

const SPINNER_TEMPLATE: &str = "{spinner:.green} {prefix:<10.cyan.bold} {wide_msg}";

/// Central progress context owning the `MultiProgress`.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: std::io::stderr().is_terminal(),
        }
    }

    /// Spinner status line, or a hidden bar off a TTY.
    ///
    /// Update with `pb.set_message(...)`; call `pb.finish_and_clear()` when done.
    pub fn status_line(&self, name: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::with_template(SPINNER_TEMPLATE) {
            pb.set_style(style);
        }
        pb.set_prefix(name.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// Print a line above managed progress bars (avoids interference).
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.is_tty {
            let _ = self.multi.println(msg);
        } else {
            eprintln!("{}", msg.as_ref());
        }
    }

    /// Whether running in TTY mode.
    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for `ProgressContext`.
pub type SharedProgress = Arc<ProgressContext>;

/// Notifier decorator that mirrors retry state onto a spinner line.
///
/// The attempt budget is read from each notice, so one notifier can serve
/// operations under different policies.
pub struct ProgressNotifier<N> {
    bar: ProgressBar,
    inner: N,
}

impl<N: Notifier> ProgressNotifier<N> {
    pub fn new(bar: ProgressBar, inner: N) -> Self {
        Self { bar, inner }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl<N: Notifier> Notifier for ProgressNotifier<N> {
    fn warn(&self, notice: &RetryNotice<'_>) {
        let next = notice
            .max_attempts
            .saturating_sub(notice.remaining)
            .saturating_add(1);
        self.bar
            .set_message(format!("retry {next}/{}...", notice.max_attempts));
        self.inner.warn(notice);
    }

    fn error(&self, notice: &ExhaustedNotice<'_>) {
        self.bar
            .abandon_with_message(format!("failed after {} attempts", notice.attempts));
        self.inner.error(notice);
    }
}

/// Format number with thousand separators.
pub fn fmt_num(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
