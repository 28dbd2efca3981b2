//! Storage collaborator consumed by the engine.
//!
//! Both scans hand back an unopened operator; the caller owns its lifecycle.

use std::sync::Arc;

use spanflow_core::predicate::{IndexQuery, ResultWindow};
use spanflow_core::schema::Schema;
use spanflow_operators::BoxedOperator;
use spanflow_text::AnalyzerKind;

use crate::error::Result;

pub trait Storage: Send + Sync {
    /// Schema of `table`, `_id` included.
    fn schema(&self, table: &str) -> Result<Arc<Schema>>;

    /// Every row of `table` in insertion order.
    fn open_scan(&self, table: &str, window: ResultWindow) -> Result<BoxedOperator>;

    /// Rows of `table` that can satisfy `query`. May return a superset of
    /// the true matches but never drops one.
    fn open_indexed_query(
        &self,
        table: &str,
        query: &IndexQuery,
        window: ResultWindow,
    ) -> Result<BoxedOperator>;

    fn table_names(&self) -> Vec<String>;

    /// Analyzer the term index was built with; `None` when the storage keeps
    /// no index and `open_indexed_query` degrades to a scan.
    fn index_analyzer(&self) -> Option<AnalyzerKind> {
        None
    }
}
