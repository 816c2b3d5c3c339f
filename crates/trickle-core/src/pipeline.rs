//! Stage composition
//!
//! Stages are unary transforms from one [`Sequence`] to another. A
//! [`Pipeline`] chains any number of them so that the last stage wraps the
//! one before it, down to the source: `Sn(...S1(source))`. Composition only
//! nests iterators, so building a pipeline realizes nothing; each pull does
//! at most one step of work per stage plus the skipped non-matches.
//!
//! The built-in stages stop scanning once process shutdown is requested.
//! Every composed stage logs one debug line when its output ends, with the
//! number of records it passed on.

use std::fmt;

use crate::error::{PipelineError, Pull};
use crate::filter::{contains, filter, status_is, try_filter};
use crate::record::Record;
use crate::shutdown::shutdown_flag;

/// Type-erased lazy record sequence.
pub type Sequence = Box<dyn Iterator<Item = Pull<Record>>>;

/// A composable transform over a record sequence.
pub trait Stage {
    /// Diagnostic name, used in logs and predicate errors.
    fn name(&self) -> String;

    /// Wrap `upstream`, consuming the stage.
    fn apply(self: Box<Self>, upstream: Sequence) -> Sequence;
}

/// Keep records whose derived status equals the given label.
#[derive(Debug, Clone)]
pub struct StatusStage {
    status: String,
}

impl StatusStage {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

impl Stage for StatusStage {
    fn name(&self) -> String {
        format!("status={}", self.status)
    }

    fn apply(self: Box<Self>, upstream: Sequence) -> Sequence {
        Box::new(filter(upstream, status_is(self.status)).cancel_on(shutdown_flag()))
    }
}

/// Keep records whose payload contains a needle.
#[derive(Debug, Clone)]
pub struct SearchStage {
    needle: String,
}

impl SearchStage {
    pub fn new(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
        }
    }
}

impl Stage for SearchStage {
    fn name(&self) -> String {
        format!("search({})", self.needle)
    }

    fn apply(self: Box<Self>, upstream: Sequence) -> Sequence {
        Box::new(filter(upstream, contains(self.needle)).cancel_on(shutdown_flag()))
    }
}

/// Named filter over an arbitrary fallible predicate.
///
/// A predicate error becomes [`PipelineError::Predicate`] tagged with this
/// stage's name and the offending record index.
pub struct FnStage<F> {
    name: String,
    predicate: F,
}

impl<F> FnStage<F>
where
    F: FnMut(&Record) -> Result<bool, String> + 'static,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> Stage for FnStage<F>
where
    F: FnMut(&Record) -> Result<bool, String> + 'static,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    fn apply(self: Box<Self>, upstream: Sequence) -> Sequence {
        let Self {
            name,
            mut predicate,
        } = *self;
        let stage = try_filter(upstream, move |r: &Record| -> Pull<bool> {
            predicate(r).map_err(|message| PipelineError::Predicate {
                stage: name.clone(),
                index: r.index(),
                message,
            })
        });
        Box::new(stage.cancel_on(shutdown_flag()))
    }
}

impl<F> fmt::Debug for FnStage<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered chain of stages, first-applied first.
///
/// A pipeline is itself a [`Stage`], so chains can be grouped and nested
/// freely; any grouping yields the same output sequence.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage; it will wrap everything added before it.
    #[must_use]
    pub fn then(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in application order.
    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Compose all stages over `source`. Nothing is realized until the
    /// returned sequence is pulled.
    pub fn run<I>(self, source: I) -> Sequence
    where
        I: IntoIterator<Item = Pull<Record>>,
        I::IntoIter: 'static,
    {
        compose(source, self.stages)
    }
}

impl Stage for Pipeline {
    fn name(&self) -> String {
        self.stage_names().join(" | ")
    }

    fn apply(self: Box<Self>, upstream: Sequence) -> Sequence {
        self.stages.into_iter().fold(upstream, traced)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Chain `stages` over `source`: the first stage wraps the source, each
/// later stage wraps its predecessor.
pub fn compose<I, S>(source: I, stages: S) -> Sequence
where
    I: IntoIterator<Item = Pull<Record>>,
    I::IntoIter: 'static,
    S: IntoIterator<Item = Box<dyn Stage>>,
{
    let source: Sequence = Box::new(source.into_iter());
    stages.into_iter().fold(source, |seq, stage| {
        log::debug!("pipeline: adding stage {}", stage.name());
        traced(seq, stage)
    })
}

fn traced(upstream: Sequence, stage: Box<dyn Stage>) -> Sequence {
    let name = stage.name();
    Box::new(Traced::new(name, stage.apply(upstream)))
}

/// Stage output that logs a summary once it ends or fails.
struct Traced {
    name: String,
    inner: Sequence,
    yielded: u64,
    done: bool,
}

impl Traced {
    fn new(name: String, inner: Sequence) -> Self {
        Self {
            name,
            inner,
            yielded: 0,
            done: false,
        }
    }
}

impl Iterator for Traced {
    type Item = Pull<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.inner.next() {
            Some(Ok(record)) => {
                self.yielded += 1;
                Some(Ok(record))
            }
            Some(Err(e)) => {
                self.done = true;
                log::debug!("stage {}: failed after {} records: {e}", self.name, self.yielded);
                Some(Err(e))
            }
            None => {
                self.done = true;
                log::debug!("stage {}: exhausted after {} records", self.name, self.yielded);
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            self.inner.size_hint()
        }
    }
}
