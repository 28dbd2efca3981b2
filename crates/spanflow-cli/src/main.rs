//! spanflow CLI: run, validate and explain YAML pipelines.

use clap::{Args, Parser, Subcommand};
use spanflow_core::config::EngineConfig;
use spanflow_exec::{run_pipeline, JsonlSink};
use spanflow_planner::{explain, optimize, parse_yaml_pipeline, resolve_analyzers, Pipeline};
use spanflow_text::Analyzer;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spanflow")]
#[command(about = "spanflow: pull-based keyword matching and span joins over text tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Flags that override both the environment and the pipeline's config block.
#[derive(Args, Debug, Default, Clone)]
struct Overrides {
    /// Analyzer used to index tables (standard, simple)
    #[arg(long)]
    analyzer: Option<String>,

    /// Never rewrite scans into index-backed scans
    #[arg(long)]
    no_index: bool,

    /// Stop after this many result tuples
    #[arg(long)]
    limit: Option<usize>,

    /// Directory relative sink destinations are resolved against
    #[arg(long)]
    output_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a pipeline; results without a declared sink go to stdout as JSONL
    Run {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,

        #[command(flatten)]
        overrides: Overrides,

        /// Also write the run manifest as JSON to this path
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Validate a pipeline YAML file
    Validate {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,
    },

    /// Show the plan as written and as it would run
    Explain {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            pipeline,
            overrides,
            manifest,
        } => run(&pipeline, &overrides, manifest.as_deref()),
        Commands::Validate { pipeline } => {
            load(&pipeline).map(|_| println!("✓ Pipeline is valid"))
        }
        Commands::Explain {
            pipeline,
            overrides,
        } => explain_pipeline(&pipeline, &overrides),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load(path: &Path) -> Result<Pipeline, Box<dyn std::error::Error>> {
    let yaml_content = fs::read_to_string(path)?;
    let pipeline = parse_yaml_pipeline(&yaml_content)?;
    tracing::info!(path = %path.display(), tables = pipeline.tables.len(), "pipeline loaded");
    Ok(pipeline)
}

/// Environment first, then the pipeline's `config:` block, then CLI flags.
fn resolve_config(base: EngineConfig, pipeline: &Pipeline, overrides: &Overrides) -> EngineConfig {
    let mut cfg = base;
    if let Some(doc) = &pipeline.config {
        doc.apply(&mut cfg);
    }
    if let Some(a) = &overrides.analyzer {
        cfg.analyzer = a.clone();
    }
    if overrides.no_index {
        cfg.use_index = false;
    }
    if let Some(l) = overrides.limit {
        cfg.result_limit = Some(l);
    }
    if let Some(d) = &overrides.output_dir {
        cfg.output_dir = d.clone();
    }
    cfg
}

fn run(
    pipeline_path: &Path,
    overrides: &Overrides,
    manifest_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = load(pipeline_path)?;
    let config = resolve_config(EngineConfig::from_env(), &pipeline, overrides);
    let base_dir = pipeline_path.parent().unwrap_or_else(|| Path::new("."));

    let mut stdout = JsonlSink::new(io::stdout().lock());
    let manifest = run_pipeline(&pipeline, config, base_dir, &mut stdout)?;

    if let Some(path) = manifest_path {
        fs::write(path, serde_json::to_string_pretty(&manifest)?)?;
    }

    eprintln!("✓ Pipeline executed successfully");
    eprintln!("  Tuples: {}", manifest.tuples_emitted);
    eprintln!("  Spans: {}", manifest.spans_emitted);
    eprintln!("  Duration: {}ms", manifest.duration_ms());
    eprintln!("  Plan hash: {}", manifest.plan_hash);
    Ok(())
}

fn explain_pipeline(
    pipeline_path: &Path,
    overrides: &Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = load(pipeline_path)?;
    let config = resolve_config(EngineConfig::from_env(), &pipeline, overrides);
    let index = if config.use_index {
        Some(Analyzer::by_name(&config.analyzer)?.kind())
    } else {
        None
    };

    println!("Pipeline Plan");
    println!("=============");
    println!();
    println!("Tables:");
    for t in &pipeline.tables {
        let source = t.path.as_deref().unwrap_or("(empty)");
        println!("  {} <- {} ({} attributes)", t.name, source, t.schema.len());
    }
    println!();
    println!("As written:");
    print!("{}", indent(&explain(&pipeline.plan)));
    println!();
    println!("As executed (analyzer={}, index={}):", config.analyzer, config.use_index);
    let executed = optimize(resolve_analyzers(pipeline.plan.clone(), &config.analyzer), index);
    print!("{}", indent(&explain(&executed)));
    if let Some(limit) = config.result_limit {
        println!();
        println!("Result limit: {limit}");
    }
    Ok(())
}

fn indent(text: &str) -> String {
    text.lines().map(|l| format!("  {l}\n")).collect()
}
