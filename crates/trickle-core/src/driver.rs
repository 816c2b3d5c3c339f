//! Consumer side of a pipeline
//!
//! The driver owns termination: it pulls one record at a time and stops on
//! exhaustion, on reaching its limit, or when cancelled. It never pulls a
//! record it will not hand to the callback.
//!
//! The cancel flag is checked between pulls. A single pull can still scan
//! many non-matching records inside a filter stage; the built-in stages
//! watch the shutdown flag themselves and end their sequence when it is
//! set. The driver reports that end as an early stop, not as exhaustion.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Pull;
use crate::record::Record;
use crate::shutdown::shutdown_flag;

/// Outcome of a successful drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveSummary {
    /// Records handed to the callback.
    pub consumed: usize,
    /// True if the driver stopped before the sequence was exhausted.
    pub stopped_early: bool,
}

/// Pull-based consumer with an optional limit and cancel flag.
#[derive(Debug, Clone, Copy)]
pub struct Driver {
    limit: Option<usize>,
    cancel: &'static AtomicBool,
}

impl Default for Driver {
    fn default() -> Self {
        Self {
            limit: None,
            cancel: shutdown_flag(),
        }
    }
}

impl Driver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop after `limit` records.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Stop when `flag` is set instead of the process shutdown flag.
    #[must_use]
    pub const fn cancel_on(mut self, flag: &'static AtomicBool) -> Self {
        self.cancel = flag;
        self
    }

    /// Pull records into `on_record` until the sequence ends or the driver
    /// decides to stop. The first pipeline error is returned as-is; records
    /// already handed over stay consumed.
    pub fn drive<I, F>(&self, sequence: I, mut on_record: F) -> Pull<DriveSummary>
    where
        I: IntoIterator<Item = Pull<Record>>,
        F: FnMut(Record),
    {
        let mut sequence = sequence.into_iter();
        let mut consumed = 0usize;
        loop {
            if self.limit.is_some_and(|limit| consumed >= limit) {
                log::debug!("driver: limit of {consumed} reached");
                return Ok(DriveSummary {
                    consumed,
                    stopped_early: true,
                });
            }
            if self.cancel.load(Ordering::Relaxed) {
                log::info!("driver: cancelled after {consumed} records");
                return Ok(DriveSummary {
                    consumed,
                    stopped_early: true,
                });
            }
            match sequence.next() {
                Some(Ok(record)) => {
                    consumed += 1;
                    on_record(record);
                }
                Some(Err(e)) => {
                    log::debug!("driver: sequence failed after {consumed} records: {e}");
                    return Err(e);
                }
                None => {
                    // A stage that observed the flag mid-scan ends like exhaustion
                    let cancelled = self.cancel.load(Ordering::Relaxed);
                    if cancelled {
                        log::info!("driver: cancelled after {consumed} records");
                    }
                    return Ok(DriveSummary {
                        consumed,
                        stopped_early: cancelled,
                    });
                }
            }
        }
    }
}

/// Drive `sequence` with an optional limit, stopping on process shutdown.
pub fn drive<I, F>(sequence: I, limit: Option<usize>, on_record: F) -> Pull<DriveSummary>
where
    I: IntoIterator<Item = Pull<Record>>,
    F: FnMut(Record),
{
    let driver = match limit {
        Some(n) => Driver::new().limit(n),
        None => Driver::new(),
    };
    driver.drive(sequence, on_record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::filter::filter;
    use crate::source::{RecordSource, produce};
    use std::cell::Cell;
    use std::rc::Rc;

    static NEVER: AtomicBool = AtomicBool::new(false);

    #[test]
    fn drains_whole_sequence() {
        let mut seen = Vec::new();
        let summary = Driver::new()
            .cancel_on(&NEVER)
            .drive(produce(3), |r| seen.push(r.index()))
            .unwrap();
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(
            summary,
            DriveSummary {
                consumed: 3,
                stopped_early: false,
            }
        );
    }

    #[test]
    fn limit_stops_without_extra_pull() {
        let realized = Rc::new(Cell::new(0u64));
        let counter = realized.clone();
        let source = RecordSource::from_fn(1_000, move |i| {
            counter.set(counter.get() + 1);
            Ok(Record::log_line(i, "OK"))
        });
        let summary = Driver::new()
            .limit(5)
            .cancel_on(&NEVER)
            .drive(source, |_| {})
            .unwrap();
        assert_eq!(summary.consumed, 5);
        assert!(summary.stopped_early);
        assert_eq!(realized.get(), 5);
    }

    #[test]
    fn limit_zero_pulls_nothing() {
        let summary = Driver::new()
            .limit(0)
            .cancel_on(&NEVER)
            .drive(produce(3), |_| panic!("no record expected"))
            .unwrap();
        assert_eq!(summary.consumed, 0);
        assert!(summary.stopped_early);
    }

    #[test]
    fn limit_equal_to_length_reports_early_stop() {
        let summary = Driver::new()
            .limit(3)
            .cancel_on(&NEVER)
            .drive(produce(3), |_| {})
            .unwrap();
        assert_eq!(summary.consumed, 3);
        assert!(summary.stopped_early);
    }

    #[test]
    fn cancelled_driver_stops() {
        static CANCEL: AtomicBool = AtomicBool::new(false);
        let summary = Driver::new()
            .cancel_on(&CANCEL)
            .drive(produce(10), |r| {
                if r.index() == 1 {
                    CANCEL.store(true, Ordering::Relaxed);
                }
            })
            .unwrap();
        assert_eq!(summary.consumed, 2);
        assert!(summary.stopped_early);
    }

    #[test]
    fn cancel_during_filter_scan_is_an_early_stop() {
        static CANCEL: AtomicBool = AtomicBool::new(false);
        let source = RecordSource::from_fn(1_000_000, |i| {
            let status = if i == 0 { "OK" } else { "SKIP" };
            Ok(Record::log_line(i, status))
        });
        let stage = filter(source, |r: &Record| {
            if r.index() == 10 {
                CANCEL.store(true, Ordering::Relaxed);
            }
            r.status() == Some("OK")
        })
        .cancel_on(&CANCEL);
        let summary = Driver::new()
            .cancel_on(&CANCEL)
            .drive(stage, |_| {})
            .unwrap();
        assert_eq!(
            summary,
            DriveSummary {
                consumed: 1,
                stopped_early: true,
            }
        );
    }

    #[test]
    fn error_surfaces_after_valid_records() {
        let source = RecordSource::from_fn(5, |i| {
            if i == 2 {
                Err(PipelineError::Source {
                    index: i,
                    message: "corrupt".to_string(),
                })
            } else {
                Ok(Record::log_line(i, "OK"))
            }
        });
        let mut seen = Vec::new();
        let err = Driver::new()
            .cancel_on(&NEVER)
            .drive(source, |r| seen.push(r.index()))
            .unwrap_err();
        assert_eq!(seen, vec![0, 1]);
        assert_eq!(err.index(), 2);
    }
}
