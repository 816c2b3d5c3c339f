//! Error types for pipelines and retried operations

use std::fmt;
use std::io;

/// Result of pulling one element from a sequence.
pub type Pull<T> = Result<T, PipelineError>;

/// Failure raised while realizing a sequence element.
///
/// Once a sequence yields one of these it is terminated: every later pull
/// returns `None`. Elements yielded before the failure stay valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The source could not produce the record at `index`.
    Source { index: u64, message: String },
    /// A stage predicate failed while inspecting the record at `index`.
    Predicate {
        stage: String,
        index: u64,
        message: String,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source { index, message } => write!(f, "source failed at record {index}: {message}"),
            Self::Predicate {
                stage,
                index,
                message,
            } => write!(f, "stage '{stage}' failed at record {index}: {message}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl PipelineError {
    /// Index of the record being realized when the failure happened.
    pub const fn index(&self) -> u64 {
        match self {
            Self::Source { index, .. } | Self::Predicate { index, .. } => *index,
        }
    }
}

/// Rejected source construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Cycling source needs at least one status label.
    NoStatuses,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoStatuses => f.write_str("status list must not be empty"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Rejected retry policy construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPolicy {
    pub max_attempts: u32,
}

impl fmt::Display for InvalidPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max_attempts must be at least 1 (got {})",
            self.max_attempts
        )
    }
}

impl std::error::Error for InvalidPolicy {}

/// Classification deciding whether the retry wrapper tries again.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl<T: Retryable + ?Sized> Retryable for &T {
    fn is_retryable(&self) -> bool {
        (**self).is_retryable()
    }
}

/// Connectivity-style I/O faults are transient, everything else is not.
impl Retryable for io::Error {
    fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::NotConnected
                | io::ErrorKind::TimedOut
                | io::ErrorKind::Interrupted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::WouldBlock
        )
    }
}

/// General-purpose operation failure with an explicit class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Worth retrying, e.g. a dropped connection.
    Transient(String),
    /// Retrying cannot help.
    NonTransient(String),
}

impl Failure {
    pub fn transient(cause: impl Into<String>) -> Self {
        Self::Transient(cause.into())
    }

    pub fn non_transient(cause: impl Into<String>) -> Self {
        Self::NonTransient(cause.into())
    }

    pub fn cause(&self) -> &str {
        match self {
            Self::Transient(c) | Self::NonTransient(c) => c,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cause())
    }
}

impl std::error::Error for Failure {}

impl Retryable for Failure {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<io::Error> for Failure {
    fn from(e: io::Error) -> Self {
        if e.is_retryable() {
            Self::Transient(e.to_string())
        } else {
            Self::NonTransient(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn io_connection_refused_retryable() {
        let err = io::Error::new(ErrorKind::ConnectionRefused, "refused");
        assert!(err.is_retryable());
    }

    #[test]
    fn io_timeout_retryable() {
        let err = io::Error::new(ErrorKind::TimedOut, "timeout");
        assert!(err.is_retryable());
    }

    #[test]
    fn io_not_found_not_retryable() {
        let err = io::Error::new(ErrorKind::NotFound, "missing");
        assert!(!err.is_retryable());
    }

    #[test]
    fn io_permission_denied_not_retryable() {
        let err = io::Error::new(ErrorKind::PermissionDenied, "denied");
        assert!(!err.is_retryable());
    }

    #[test]
    fn failure_classes() {
        assert!(Failure::transient("Network down!").is_retryable());
        assert!(!Failure::non_transient("bad input").is_retryable());
    }

    #[test]
    fn failure_from_io_keeps_class() {
        let f = Failure::from(io::Error::new(ErrorKind::ConnectionReset, "reset"));
        assert!(matches!(f, Failure::Transient(_)));
        let f = Failure::from(io::Error::new(ErrorKind::InvalidData, "garbage"));
        assert!(matches!(f, Failure::NonTransient(_)));
    }

    #[test]
    fn failure_display_is_cause() {
        assert_eq!(Failure::transient("Network down!").to_string(), "Network down!");
    }

    #[test]
    fn retryable_through_reference() {
        let f = Failure::transient("x");
        assert!((&f).is_retryable());
    }

    #[test]
    fn pipeline_error_display() {
        let err = PipelineError::Source {
            index: 3,
            message: "disk gone".to_string(),
        };
        assert_eq!(err.to_string(), "source failed at record 3: disk gone");
        assert_eq!(err.index(), 3);

        let err = PipelineError::Predicate {
            stage: "status=OK".to_string(),
            index: 9,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "stage 'status=OK' failed at record 9: boom");
        assert_eq!(err.index(), 9);
    }

    #[test]
    fn invalid_policy_display() {
        let msg = InvalidPolicy { max_attempts: 0 }.to_string();
        assert!(msg.contains("at least 1"));
    }
}
