//! Records flowing through a pipeline

use std::fmt;

/// Marker preceding the status token inside a payload.
const STATUS_MARKER: &str = "status=";

/// A single immutable unit of pipeline data.
///
/// Synthetic records look like `logline 42 - status=OK`; the status is
/// derived from the payload on demand rather than stored separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    index: u64,
    payload: String,
}

impl Record {
    pub fn new(index: u64, payload: impl Into<String>) -> Self {
        Self {
            index,
            payload: payload.into(),
        }
    }

    /// Synthetic log line with the given status.
    pub fn log_line(index: u64, status: &str) -> Self {
        Self::new(index, format!("logline {index} - {STATUS_MARKER}{status}"))
    }

    pub const fn index(&self) -> u64 {
        self.index
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Whitespace-delimited token after `status=`, if any.
    pub fn status(&self) -> Option<&str> {
        let start = self.payload.find(STATUS_MARKER)? + STATUS_MARKER.len();
        let rest = &self.payload[start..];
        let token = rest.split_whitespace().next()?;
        // `split_whitespace` skips leading spaces, so "status= OK" has no status
        if rest.starts_with(token) {
            Some(token)
        } else {
            None
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_line_payload() {
        let r = Record::log_line(7, "OK");
        assert_eq!(r.index(), 7);
        assert_eq!(r.payload(), "logline 7 - status=OK");
        assert_eq!(r.to_string(), "logline 7 - status=OK");
    }

    #[test]
    fn status_derived_from_payload() {
        assert_eq!(Record::log_line(0, "WARN").status(), Some("WARN"));
    }

    #[test]
    fn status_stops_at_whitespace() {
        let r = Record::new(1, "x status=ERROR extra=1");
        assert_eq!(r.status(), Some("ERROR"));
    }

    #[test]
    fn status_missing() {
        assert_eq!(Record::new(2, "no marker here").status(), None);
        assert_eq!(Record::new(3, "trailing status=").status(), None);
        assert_eq!(Record::new(4, "spaced status= OK").status(), None);
    }
}
