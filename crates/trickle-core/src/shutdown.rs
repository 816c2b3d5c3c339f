//! Process-wide cancellation via atomic flag
//!
//! Set by the SIGINT/SIGTERM handler. The driver stops pulling once it is
//! set and [`ThreadPause`](crate::pause::ThreadPause) wakes early, which
//! fails any retry that is waiting between attempts.

use std::sync::atomic::{AtomicBool, Ordering};

/// Global shutdown flag
pub fn shutdown_flag() -> &'static AtomicBool {
    static FLAG: AtomicBool = AtomicBool::new(false);
    &FLAG
}

/// Check if shutdown was requested
pub fn is_shutdown_requested() -> bool {
    shutdown_flag().load(Ordering::Relaxed)
}

/// Request shutdown (for signal handlers)
///
/// Returns whether a shutdown had already been requested.
pub fn request_shutdown() -> bool {
    shutdown_flag().swap(true, Ordering::Relaxed)
}

