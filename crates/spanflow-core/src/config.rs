//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::predicate::DEFAULT_ANALYZER;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Analyzer that indexes stored tables and runs keyword predicates that
    /// name none of their own.
    pub analyzer: String,

    /// Rewrite keyword scans in conjunction/phrase mode into index-backed scans.
    pub use_index: bool,

    /// Cap applied to the final result stream when the plan leaves it unbounded.
    pub result_limit: Option<usize>,

    /// Directory that relative sink destinations are resolved against.
    pub output_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analyzer: DEFAULT_ANALYZER.to_string(),
            use_index: true,
            result_limit: None,
            output_dir: ".".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `SPANFLOW_ANALYZER`: analyzer name
    /// - `SPANFLOW_USE_INDEX`: `true`/`false`
    /// - `SPANFLOW_RESULT_LIMIT`: cap on emitted results
    /// - `SPANFLOW_OUTPUT_DIR`: base directory for sink files
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as `from_env` but reads variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(s) = lookup("SPANFLOW_ANALYZER") {
            cfg.analyzer = s;
        }

        if let Some(s) = lookup("SPANFLOW_USE_INDEX") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.use_index = v;
            }
        }

        if let Some(s) = lookup("SPANFLOW_RESULT_LIMIT") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.result_limit = Some(v);
            }
        }

        if let Some(s) = lookup("SPANFLOW_OUTPUT_DIR") {
            cfg.output_dir = s;
        }

        cfg
    }
}
