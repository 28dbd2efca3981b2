//! YAML → `Pipeline` parser.
//!
//! Example:
//! ```yaml
//! config: { analyzer: standard, use_index: true }
//! tables:
//!   - name: notes
//!     path: data/notes.csv
//!     schema:
//!       - { name: title, type: string }
//!       - { name: body,  type: text }
//! plan:
//!   op: join
//!   id: near
//!   attribute: body
//!   threshold: 20
//!   outer:
//!     op: keyword
//!     id: book
//!     query: book
//!     attributes: [body]
//!     mode: conjunction
//!     input: { op: scan, table: notes }
//!   inner:
//!     op: keyword
//!     id: doctor
//!     query: doctor
//!     attributes: [body]
//!     mode: conjunction
//!     input: { op: scan, table: notes }
//! sink: { destination: out/near.jsonl, format: jsonl }
//! ```

use serde::{Deserialize, Serialize};

use spanflow_core::config::EngineConfig;
use spanflow_core::dag::LogicalPlan;
use spanflow_core::schema::Schema;

use crate::error::Result;
use crate::validate::validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub config: Option<PipelineConfig>,
    #[serde(default)]
    pub tables: Vec<TableDef>,
    pub plan: LogicalPlan,
    #[serde(default)]
    pub sink: Option<SinkDef>,
}

/// Engine settings a pipeline may override. Unset keys keep the value
/// coming from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub analyzer: Option<String>,
    pub use_index: Option<bool>,
    pub result_limit: Option<usize>,
    pub output_dir: Option<String>,
}

impl PipelineConfig {
    pub fn apply(&self, cfg: &mut EngineConfig) {
        if let Some(a) = &self.analyzer {
            cfg.analyzer = a.clone();
        }
        if let Some(v) = self.use_index {
            cfg.use_index = v;
        }
        if let Some(v) = self.result_limit {
            cfg.result_limit = Some(v);
        }
        if let Some(d) = &self.output_dir {
            cfg.output_dir = d.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    /// CSV file loaded into the table; relative to the pipeline file.
    #[serde(default)]
    pub path: Option<String>,
    pub schema: Schema,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkFormat {
    #[default]
    Jsonl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkDef {
    pub destination: String,
    #[serde(default)]
    pub format: SinkFormat,
}

/// Parse and validate a pipeline document.
pub fn parse_yaml_pipeline(yaml_src: &str) -> Result<Pipeline> {
    let pipeline: Pipeline = serde_yaml::from_str(yaml_src)?;
    validate(&pipeline)?;
    Ok(pipeline)
}
