//! Filter stage and common record predicates

use std::iter::FusedIterator;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Pull;
use crate::record::Record;

/// Order-preserving filter over an upstream sequence.
///
/// Each pull realizes upstream records only until one matches or upstream
/// ends; non-matches are dropped immediately, so nothing is held between
/// pulls. An upstream or predicate error is passed through once and ends
/// the sequence.
///
/// With a cancel flag attached, the flag is checked before every upstream
/// pull, so a long run of non-matches still stops promptly. Cancellation
/// ends the sequence as if upstream were exhausted.
#[derive(Debug)]
pub struct Filter<I, P> {
    upstream: I,
    predicate: P,
    cancel: Option<&'static AtomicBool>,
    terminated: bool,
}

impl<I, P> Filter<I, P> {
    pub const fn new(upstream: I, predicate: P) -> Self {
        Self {
            upstream,
            predicate,
            cancel: None,
            terminated: false,
        }
    }

    /// Stop scanning once `flag` is set.
    #[must_use]
    pub fn cancel_on(mut self, flag: &'static AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

impl<I, P> Iterator for Filter<I, P>
where
    I: Iterator<Item = Pull<Record>>,
    P: FnMut(&Record) -> Pull<bool>,
{
    type Item = Pull<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.terminated {
            return None;
        }
        loop {
            if self.cancelled() {
                log::debug!("filter: cancelled while scanning upstream");
                self.terminated = true;
                return None;
            }
            let record = match self.upstream.next() {
                Some(Ok(record)) => record,
                Some(Err(e)) => {
                    self.terminated = true;
                    return Some(Err(e));
                }
                None => {
                    self.terminated = true;
                    return None;
                }
            };
            match (self.predicate)(&record) {
                Ok(true) => return Some(Ok(record)),
                Ok(false) => {}
                Err(e) => {
                    self.terminated = true;
                    return Some(Err(e));
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.terminated {
            return (0, Some(0));
        }
        (0, self.upstream.size_hint().1)
    }
}

impl<I, P> FusedIterator for Filter<I, P>
where
    I: Iterator<Item = Pull<Record>>,
    P: FnMut(&Record) -> Pull<bool>,
{
}

/// Keep records for which `predicate` holds.
pub fn filter<I, F>(
    upstream: I,
    mut predicate: F,
) -> Filter<I::IntoIter, impl FnMut(&Record) -> Pull<bool>>
where
    I: IntoIterator<Item = Pull<Record>>,
    F: FnMut(&Record) -> bool,
{
    Filter::new(upstream.into_iter(), move |r: &Record| -> Pull<bool> {
        Ok(predicate(r))
    })
}

/// Keep records for which a fallible `predicate` holds.
pub fn try_filter<I, F>(upstream: I, predicate: F) -> Filter<I::IntoIter, F>
where
    I: IntoIterator<Item = Pull<Record>>,
    F: FnMut(&Record) -> Pull<bool>,
{
    Filter::new(upstream.into_iter(), predicate)
}

/// Predicate: derived status equals `status`.
pub fn status_is(status: impl Into<String>) -> impl Fn(&Record) -> bool {
    let status = status.into();
    move |r: &Record| r.status() == Some(status.as_str())
}

/// Predicate: payload contains `needle`.
pub fn contains(needle: impl Into<String>) -> impl Fn(&Record) -> bool {
    let needle = needle.into();
    move |r: &Record| r.payload().contains(needle.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::source::{RecordSource, produce, produce_cycling};
    use std::cell::Cell;
    use std::rc::Rc;

    fn statuses(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn keeps_matches_in_order() {
        let upstream = produce_cycling(6, &statuses(&["OK", "ERROR"])).unwrap();
        let kept: Vec<u64> = filter(upstream, status_is("OK"))
            .map(|r| r.unwrap().index())
            .collect();
        assert_eq!(kept, vec![0, 2, 4]);
    }

    #[test]
    fn no_matches_is_empty() {
        let kept = filter(produce(5), status_is("ERROR")).count();
        assert_eq!(kept, 0);
    }

    #[test]
    fn contains_matches_substring() {
        let kept: Vec<u64> = filter(produce(12), contains("logline 1"))
            .map(|r| r.unwrap().index())
            .collect();
        assert_eq!(kept, vec![1, 10, 11]);
    }

    #[test]
    fn realizes_only_up_to_next_match() {
        let realized = Rc::new(Cell::new(0u64));
        let counter = realized.clone();
        let upstream = RecordSource::from_fn(100, move |i| {
            counter.set(counter.get() + 1);
            let status = if i % 3 == 2 { "OK" } else { "SKIP" };
            Ok(Record::log_line(i, status))
        });
        let mut stage = filter(upstream, status_is("OK"));

        assert_eq!(stage.next().unwrap().unwrap().index(), 2);
        assert_eq!(realized.get(), 3);
        assert_eq!(stage.next().unwrap().unwrap().index(), 5);
        assert_eq!(realized.get(), 6);
    }

    #[test]
    fn predicate_error_terminates() {
        let mut stage = try_filter(produce(5), |r: &Record| {
            if r.index() == 2 {
                Err(PipelineError::Predicate {
                    stage: "picky".to_string(),
                    index: r.index(),
                    message: "cannot decide".to_string(),
                })
            } else {
                Ok(true)
            }
        });
        assert_eq!(stage.next().unwrap().unwrap().index(), 0);
        assert_eq!(stage.next().unwrap().unwrap().index(), 1);
        assert_eq!(stage.next().unwrap().unwrap_err().index(), 2);
        assert!(stage.next().is_none());
    }

    #[test]
    fn upstream_error_is_not_skipped() {
        let upstream = RecordSource::from_fn(4, |i| {
            if i == 1 {
                Err(PipelineError::Source {
                    index: i,
                    message: "bad read".to_string(),
                })
            } else {
                Ok(Record::log_line(i, "SKIP"))
            }
        });
        // Record 0 is a non-match; the error at 1 must still surface
        let mut stage = filter(upstream, status_is("OK"));
        assert!(matches!(
            stage.next(),
            Some(Err(PipelineError::Source { index: 1, .. }))
        ));
        assert!(stage.next().is_none());
    }

    #[test]
    fn cancel_stops_a_scan_over_non_matches() {
        static CANCEL: AtomicBool = AtomicBool::new(false);
        let realized = Rc::new(Cell::new(0u64));
        let counter = realized.clone();
        let upstream = RecordSource::from_fn(1_000_000, move |i| {
            counter.set(counter.get() + 1);
            Ok(Record::log_line(i, "SKIP"))
        });
        let mut stage = filter(upstream, |r: &Record| {
            if r.index() == 3 {
                CANCEL.store(true, Ordering::Relaxed);
            }
            r.status() == Some("OK")
        })
        .cancel_on(&CANCEL);

        assert!(stage.next().is_none());
        assert_eq!(realized.get(), 4);
        assert!(stage.next().is_none());
        assert_eq!(realized.get(), 4);
    }

    #[test]
    fn unset_cancel_flag_changes_nothing() {
        static CANCEL: AtomicBool = AtomicBool::new(false);
        let kept: Vec<u64> = filter(produce(4), status_is("OK"))
            .cancel_on(&CANCEL)
            .map(|r| r.unwrap().index())
            .collect();
        assert_eq!(kept, vec![0, 1, 2, 3]);
    }
}
