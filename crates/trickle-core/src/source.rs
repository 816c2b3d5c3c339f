//! Lazily realized record sources
//!
//! A source is a cursor holding only the next index and its bound. Each
//! `next()` realizes exactly one record; nothing is buffered ahead.

use std::iter::FusedIterator;

use crate::error::{Pull, SourceError};
use crate::record::Record;

/// Status carried by every record from [`produce`].
pub const DEFAULT_STATUS: &str = "OK";

/// Finite sequence of `count` records, realized one per pull.
///
/// After the generator fails the source yields that error once, then ends.
#[derive(Debug)]
pub struct RecordSource<G> {
    next: u64,
    count: u64,
    generate: G,
    terminated: bool,
}

impl<G> RecordSource<G> {
    /// Source backed by a per-index generator.
    pub const fn from_fn(count: u64, generate: G) -> Self
    where
        G: FnMut(u64) -> Pull<Record>,
    {
        Self {
            next: 0,
            count,
            generate,
            terminated: false,
        }
    }

    /// Index of the next record to realize.
    pub const fn position(&self) -> u64 {
        self.next
    }

    const fn remaining(&self) -> u64 {
        if self.terminated {
            0
        } else {
            self.count - self.next
        }
    }
}

impl<G> Iterator for RecordSource<G>
where
    G: FnMut(u64) -> Pull<Record>,
{
    type Item = Pull<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.terminated || self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let item = (self.generate)(index);
        if item.is_err() {
            self.terminated = true;
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // A failure may end the sequence early, so only the upper bound is firm
        (0, usize::try_from(self.remaining()).ok())
    }
}

impl<G> FusedIterator for RecordSource<G> where G: FnMut(u64) -> Pull<Record> {}

/// `count` synthetic log lines with status `OK`, indices `0..count`.
pub fn produce(count: u64) -> RecordSource<impl FnMut(u64) -> Pull<Record>> {
    RecordSource::from_fn(count, |i| Ok(Record::log_line(i, DEFAULT_STATUS)))
}

/// `count` synthetic log lines whose status cycles through `statuses`.
pub fn produce_cycling(
    count: u64,
    statuses: &[String],
) -> Result<RecordSource<impl FnMut(u64) -> Pull<Record>>, SourceError> {
    if statuses.is_empty() {
        return Err(SourceError::NoStatuses);
    }
    let statuses = statuses.to_vec();
    let len = statuses.len() as u64;
    Ok(RecordSource::from_fn(count, move |i| {
        // i % len < statuses.len(), so the cast back is lossless
        Ok(Record::log_line(i, &statuses[(i % len) as usize]))
    }))
}
