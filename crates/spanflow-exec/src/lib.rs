#![forbid(unsafe_code)]
//! spanflow-exec: builds operator trees from plans and drains them.
//!
//! `Engine` owns the configuration and an injected `Storage`; `run` pulls the
//! root operator into a `TupleSink` and returns a `RunManifest`.
//! `pipeline` wires a parsed YAML pipeline to an in-memory storage.

pub mod pipeline;
pub mod runtime;
pub mod sink;

pub use pipeline::{load_tables, run_pipeline};
pub use runtime::{Engine, ExecError};
pub use sink::{JsonlSink, TupleSink, VecSink};
