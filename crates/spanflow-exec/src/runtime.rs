//! Runtime: instantiate a `LogicalPlan` over a storage and drain it.
//!
//! - Rewrites the plan for index-backed scans when the config allows it.
//! - Builds one operator per plan node, children first.
//! - Pulls the root into a sink and emits a `RunManifest` carrying the hash
//!   of the plan as written (before rewrites).

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info};

use spanflow_core::config::EngineConfig;
use spanflow_core::dag::LogicalPlan;
use spanflow_core::hash::hash_plan;
use spanflow_core::manifest::RunManifest;
use spanflow_core::types::Tuple;

use spanflow_io::Storage;
use spanflow_operators::join::default_span_attribute;
use spanflow_operators::{BoxedOperator, DistanceJoin, KeywordMatcher, OpError, Operator};
use spanflow_planner::validate::validate_plan;
use spanflow_planner::{optimize, resolve_analyzers, PlanError};

use crate::sink::{TupleSink, VecSink};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Operator(#[from] OpError),
    #[error(transparent)]
    Storage(#[from] spanflow_io::Error),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Core(#[from] spanflow_core::error::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Engine owns the configuration and the storage collaborator.
pub struct Engine {
    cfg: EngineConfig,
    storage: Arc<dyn Storage>,
}

impl Engine {
    pub fn new(cfg: EngineConfig, storage: Arc<dyn Storage>) -> Self {
        Self { cfg, storage }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Validate `plan`, pin unset analyzers to the configured one and
    /// rewrite it for this engine's storage.
    pub fn prepare(&self, plan: LogicalPlan) -> Result<LogicalPlan, ExecError> {
        validate_plan(&plan)?;
        let plan = resolve_analyzers(plan, &self.cfg.analyzer);
        let index = if self.cfg.use_index {
            self.storage.index_analyzer()
        } else {
            None
        };
        Ok(optimize(plan, index))
    }

    /// Instantiate the operator tree for an already prepared plan.
    pub fn build(&self, plan: &LogicalPlan) -> Result<BoxedOperator, ExecError> {
        let op: BoxedOperator = match plan {
            LogicalPlan::Scan { table, window } => self.storage.open_scan(table, *window)?,
            LogicalPlan::IndexedScan {
                table,
                query,
                window,
            } => self.storage.open_indexed_query(table, query, *window)?,
            LogicalPlan::Keyword {
                id,
                predicate,
                input,
            } => Box::new(KeywordMatcher::new(
                id.clone(),
                predicate.clone(),
                self.build(input)?,
            )?),
            LogicalPlan::Join {
                id,
                predicate,
                outer,
                inner,
            } => Box::new(DistanceJoin::new(
                id.clone(),
                predicate.clone(),
                self.build(outer)?,
                self.build(inner)?,
            )?),
        };
        debug!(node = plan.label(), operator = op.name(), "operator built");
        Ok(op)
    }

    /// Run `plan` to completion, writing every result tuple to `sink`.
    pub fn run(&self, plan: &LogicalPlan, sink: &mut dyn TupleSink) -> Result<RunManifest, ExecError> {
        let plan_hash = hash_plan(plan)?;
        let manifest = RunManifest::new(plan_hash, now_millis());
        info!(plan = %plan_hash, tables = ?plan.tables(), "run started");

        let prepared = self.prepare(plan.clone())?;
        let mut root = self.build(&prepared)?;
        let spans_at = default_span_attribute(&root.schema());

        let drained = drain(root.as_mut(), sink, self.cfg.result_limit, spans_at);
        let closed = root.close().map_err(ExecError::from);
        let (tuples, spans) = drained?;
        closed?;
        sink.finish()?;

        let manifest = manifest.finish(now_millis(), tuples, spans);
        info!(
            plan = %plan_hash,
            tuples,
            spans,
            duration_ms = manifest.duration_ms(),
            "run finished"
        );
        Ok(manifest)
    }

    /// Run `plan` and return its tuples.
    pub fn collect(&self, plan: &LogicalPlan) -> Result<(Vec<Tuple>, RunManifest), ExecError> {
        let mut sink = VecSink::new();
        let manifest = self.run(plan, &mut sink)?;
        Ok((sink.into_tuples(), manifest))
    }
}

fn drain(
    root: &mut dyn Operator,
    sink: &mut dyn TupleSink,
    cap: Option<usize>,
    spans_at: Option<usize>,
) -> Result<(u64, u64), ExecError> {
    root.open()?;
    let (mut tuples, mut spans) = (0u64, 0u64);
    while cap.map_or(true, |c| (tuples as usize) < c) {
        let Some(tuple) = root.next()? else {
            break;
        };
        if let Some(list) = spans_at
            .and_then(|i| tuple.field(i))
            .and_then(|f| f.as_spans())
        {
            spans += list.len() as u64;
        }
        sink.write(&tuple)?;
        tuples += 1;
    }
    Ok((tuples, spans))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
