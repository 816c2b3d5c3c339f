//! Trickle Core - Lazy record pipelines and retry wrapping
//!
//! This crate provides pull-driven building blocks: a record source,
//! filter stages, a composer that chains them, a driver that consumes
//! the result, and a retry wrapper for fallible operations.

pub mod driver;
pub mod error;
pub mod filter;
pub mod logging;
pub mod pause;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod retry;
pub mod shutdown;
pub mod source;

// Re-exports for convenience
pub use driver::{DriveSummary, Driver, drive};
pub use error::{Failure, InvalidPolicy, PipelineError, Pull, Retryable, SourceError};
pub use filter::{Filter, contains, filter, status_is, try_filter};
pub use logging::{IndicatifLogger, Verbosity, init_logging};
pub use pause::{InstantPause, Pause, PauseOutcome, ThreadPause};
pub use pipeline::{FnStage, Pipeline, SearchStage, Sequence, Stage, StatusStage, compose};
pub use progress::{ProgressContext, ProgressNotifier, SharedProgress, fmt_num};
pub use record::Record;
pub use retry::{ExhaustedNotice, LogNotifier, Notifier, RetryNotice, RetryPolicy, Retrying, retry, wrap};
pub use shutdown::{is_shutdown_requested, request_shutdown, shutdown_flag};
pub use source::{RecordSource, produce, produce_cycling};
