#![forbid(unsafe_code)]
//! spanflow-planner: YAML pipelines → validated `LogicalPlan` trees.
//!
//! - `dsl::yaml` parses a pipeline document (config, tables, plan, sink).
//! - `validate` checks ids, table references and join inputs.
//! - `rules` swaps plain scans for index-backed scans where the matcher's
//!   analyzer agrees with the storage index.
//! - `explain` renders a plan as an indented tree.

pub mod dsl;
pub mod error;
pub mod explain;
pub mod rules;
pub mod validate;

pub use dsl::yaml::{parse_yaml_pipeline, Pipeline, PipelineConfig, SinkDef, SinkFormat, TableDef};
pub use error::PlanError;
pub use explain::explain;
pub use rules::{optimize, resolve_analyzers};
pub use validate::validate;
