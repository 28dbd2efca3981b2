//! Run a parsed YAML pipeline end to end.
//!
//! Declared tables are created in a fresh `MemoryStorage` (loaded from CSV
//! when a path is given); the plan runs into the declared JSONL sink, or into
//! the caller's fallback sink when the pipeline names none.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use spanflow_core::config::EngineConfig;
use spanflow_core::manifest::RunManifest;
use spanflow_io::readers::csv::load_table;
use spanflow_io::MemoryStorage;
use spanflow_planner::{Pipeline, SinkFormat, TableDef};
use spanflow_text::Analyzer;

use crate::runtime::{Engine, ExecError};
use crate::sink::{JsonlSink, TupleSink};

/// Create every declared table in `storage`. CSV paths are resolved against
/// `base_dir`.
pub fn load_tables(
    storage: &MemoryStorage,
    tables: &[TableDef],
    base_dir: &Path,
) -> Result<(), ExecError> {
    for t in tables {
        match &t.path {
            Some(path) => {
                let path = resolve(base_dir, path);
                let rows = load_table(storage, &t.name, t.schema.clone(), &path)?;
                info!(table = %t.name, rows, path = %path.display(), "table loaded");
            }
            None => {
                storage.create_table(&t.name, t.schema.clone())?;
            }
        }
    }
    Ok(())
}

fn resolve(base: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

/// Run `pipeline` with `cfg` (already merged with the pipeline's config
/// block by the caller).
pub fn run_pipeline(
    pipeline: &Pipeline,
    cfg: EngineConfig,
    base_dir: &Path,
    fallback: &mut dyn TupleSink,
) -> Result<RunManifest, ExecError> {
    let analyzer = Analyzer::by_name(&cfg.analyzer)
        .map_err(|e| ExecError::Config(e.to_string()))?;
    let storage = Arc::new(MemoryStorage::new(analyzer));
    load_tables(&storage, &pipeline.tables, base_dir)?;

    let output_dir = PathBuf::from(&cfg.output_dir);
    let engine = Engine::new(cfg, storage);
    match &pipeline.sink {
        Some(sink) => match sink.format {
            SinkFormat::Jsonl => {
                let path = resolve(&output_dir, &sink.destination);
                let mut out = JsonlSink::create(&path)?;
                let manifest = engine.run(&pipeline.plan, &mut out)?;
                info!(path = %path.display(), written = out.written(), "results written");
                Ok(manifest)
            }
        },
        None => engine.run(&pipeline.plan, fallback),
    }
}
