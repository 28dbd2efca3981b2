//! Operator trait + shared lifecycle/window bookkeeping.
//!
//! Every stage is a pull iterator: the consumer calls `open()`, then `next()`
//! until it yields `None`, then `close()`. `OperatorBase` owns the state
//! machine and the `offset`/`limit` cursor so each operator only supplies its
//! matching step.

use std::sync::Arc;

use spanflow_core::predicate::ResultWindow;
use spanflow_core::schema::Schema;
use spanflow_core::types::Tuple;
use spanflow_text::AnalyzerKind;

use crate::error::{OpError, OpResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorState {
    Created,
    Opened,
    Closed,
}

/// Pull-based operator protocol.
///
/// Invariants:
/// - `open()` and `close()` are idempotent; repeated calls are no-ops.
/// - `next()` is valid only while opened. After `close()` it fails with
///   `OpError::OperatorClosed`.
/// - Evaluation is synchronous; `next()` returns only once its result (or
///   end of stream) is known.
pub trait Operator: Send {
    fn open(&mut self) -> OpResult<()>;

    /// Next output tuple, or `None` once the window or the input is exhausted.
    fn next(&mut self) -> OpResult<Option<Tuple>>;

    fn close(&mut self) -> OpResult<()>;

    /// Output schema, fixed at construction.
    fn schema(&self) -> Arc<Schema>;

    fn state(&self) -> OperatorState;

    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// Analyzer that built the `payload` attribute of the output tuples,
    /// `None` when there is no payload or its origin is unknown.
    fn payload_analyzer(&self) -> Option<AnalyzerKind> {
        None
    }
}

pub type BoxedOperator = Box<dyn Operator>;

/// Lifecycle and result-window state shared by all operators.
#[derive(Debug)]
pub struct OperatorBase {
    label: String,
    schema: Arc<Schema>,
    state: OperatorState,
    window: ResultWindow,
    /// Results produced by the matching step, skipped ones included.
    produced: usize,
    /// Results handed to the consumer.
    emitted: usize,
    exhausted: bool,
}

impl OperatorBase {
    pub fn new(label: impl Into<String>, schema: Arc<Schema>, window: ResultWindow) -> Self {
        Self {
            label: label.into(),
            schema,
            state: OperatorState::Created,
            window,
            produced: 0,
            emitted: 0,
            exhausted: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    pub fn state(&self) -> OperatorState {
        self.state
    }

    pub fn window(&self) -> ResultWindow {
        self.window
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Returns `true` when the caller must perform the actual open work,
    /// `false` when the operator is already open.
    pub fn begin_open(&self) -> OpResult<bool> {
        match self.state {
            OperatorState::Created => Ok(true),
            OperatorState::Opened => Ok(false),
            OperatorState::Closed => Err(OpError::OperatorClosed(self.label.clone())),
        }
    }

    pub fn set_open(&mut self) {
        self.state = OperatorState::Opened;
        self.produced = 0;
        self.emitted = 0;
        self.exhausted = false;
    }

    /// Moves to `Closed`. Returns `false` when it already was closed.
    pub fn begin_close(&mut self) -> bool {
        let first = self.state != OperatorState::Closed;
        self.state = OperatorState::Closed;
        first
    }

    pub fn ensure_open(&self) -> OpResult<()> {
        match self.state {
            OperatorState::Opened => Ok(()),
            OperatorState::Created => Err(OpError::OperatorNotOpen(self.label.clone())),
            OperatorState::Closed => Err(OpError::OperatorClosed(self.label.clone())),
        }
    }

    fn window_full(&self) -> bool {
        self.window.limit.is_some_and(|l| self.emitted >= l)
    }

    /// Drive `produce` until a result inside the window turns up.
    ///
    /// The first `offset` results are discarded and nothing more is pulled
    /// once `limit` results have been emitted.
    pub fn pull<F>(&mut self, mut produce: F) -> OpResult<Option<Tuple>>
    where
        F: FnMut() -> OpResult<Option<Tuple>>,
    {
        self.ensure_open()?;
        loop {
            if self.exhausted || self.window_full() {
                return Ok(None);
            }
            let Some(tuple) = produce()? else {
                self.exhausted = true;
                return Ok(None);
            };
            self.produced += 1;
            if self.produced <= self.window.offset {
                continue;
            }
            self.emitted += 1;
            return Ok(Some(tuple));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(window: ResultWindow) -> OperatorBase {
        OperatorBase::new("t", Arc::new(Schema::empty()), window)
    }

    fn tuple() -> Tuple {
        Tuple::new(Arc::new(Schema::empty()), vec![]).unwrap()
    }

    #[test]
    fn state_transitions() {
        let mut b = base(ResultWindow::default());
        assert_eq!(b.state(), OperatorState::Created);
        assert!(matches!(b.ensure_open(), Err(OpError::OperatorNotOpen(_))));

        assert!(b.begin_open().unwrap());
        b.set_open();
        assert!(!b.begin_open().unwrap());
        assert!(b.ensure_open().is_ok());

        assert!(b.begin_close());
        assert!(!b.begin_close());
        assert!(matches!(b.ensure_open(), Err(OpError::OperatorClosed(_))));
        assert!(matches!(b.begin_open(), Err(OpError::OperatorClosed(_))));
    }

    #[test]
    fn pull_applies_offset_and_limit() {
        let mut b = base(ResultWindow::new(Some(2), 3));
        b.set_open();
        let mut calls = 0;
        let mut got = 0;
        while b
            .pull(|| {
                calls += 1;
                Ok((calls <= 10).then(tuple))
            })
            .unwrap()
            .is_some()
        {
            got += 1;
        }
        assert_eq!(got, 2);
        // Three skipped, two emitted, nothing pulled past the limit.
        assert_eq!(calls, 5);
        assert_eq!(b.produced(), 5);
        assert_eq!(b.emitted(), 2);
    }

    #[test]
    fn pull_stops_calling_after_exhaustion() {
        let mut b = base(ResultWindow::default());
        b.set_open();
        let mut calls = 0;
        assert!(b.pull(|| {
            calls += 1;
            Ok(None)
        })
        .unwrap()
        .is_none());
        assert!(b.pull(|| {
            calls += 1;
            Ok(None)
        })
        .unwrap()
        .is_none());
        assert_eq!(calls, 1);
    }
}
