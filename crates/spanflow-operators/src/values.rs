//! In-memory tuple source.
//!
//! Storage scans hand out a `ValuesOp` over the rows they selected; tests use
//! it directly as a leaf.

use std::sync::Arc;

use spanflow_core::predicate::ResultWindow;
use spanflow_core::schema::Schema;
use spanflow_core::types::Tuple;
use tracing::debug;

use crate::error::{OpError, OpResult};
use crate::traits::{Operator, OperatorBase, OperatorState};

#[derive(Debug)]
pub struct ValuesOp {
    base: OperatorBase,
    rows: Vec<Tuple>,
    cursor: usize,
}

impl ValuesOp {
    /// Every row must share `schema`.
    pub fn new(label: impl Into<String>, schema: Arc<Schema>, rows: Vec<Tuple>) -> OpResult<Self> {
        let label = label.into();
        if let Some(bad) = rows.iter().position(|t| t.schema().as_ref() != schema.as_ref()) {
            return Err(OpError::config(
                label,
                format!("row {bad} does not match the source schema"),
            ));
        }
        Ok(Self {
            base: OperatorBase::new(label, schema, ResultWindow::default()),
            rows,
            cursor: 0,
        })
    }

    pub fn with_window(mut self, window: ResultWindow) -> Self {
        self.base = OperatorBase::new(self.base.label(), self.base.schema(), window);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Operator for ValuesOp {
    fn open(&mut self) -> OpResult<()> {
        if !self.base.begin_open()? {
            return Ok(());
        }
        self.cursor = 0;
        self.base.set_open();
        debug!(source = self.base.label(), rows = self.rows.len(), "values source opened");
        Ok(())
    }

    fn next(&mut self) -> OpResult<Option<Tuple>> {
        let Self { base, rows, cursor } = self;
        base.pull(|| {
            let row = rows.get(*cursor).cloned();
            if row.is_some() {
                *cursor += 1;
            }
            Ok(row)
        })
    }

    fn close(&mut self) -> OpResult<()> {
        if self.base.begin_close() {
            debug!(source = self.base.label(), emitted = self.base.emitted(), "values source closed");
            self.rows.clear();
        }
        Ok(())
    }

    fn schema(&self) -> Arc<Schema> {
        self.base.schema()
    }

    fn state(&self) -> OperatorState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "values"
    }
}
