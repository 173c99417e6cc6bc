//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvSeriesAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::jsonl_adapter::JsonLinesAdapter;
use crate::domain::batch::{BatchSummary, batch_compute};
use crate::domain::capability::Category;
use crate::domain::engine::{Engine, SYNTHESIS_UNIT};
use crate::domain::error::QuantscanError;
use crate::domain::output::OutputValue;
use crate::domain::plan::{ExecutionPlan, Preset};
use crate::domain::plan_config::{
    build_plan, date_range, parse_list, register_rules, validate_plan_config,
};
use crate::domain::registry::Registry;
use crate::domain::result::AnalysisResult;
use crate::domain::rule_parser;
use crate::domain::series::Series;
use crate::domain::synthesis::PATTERN_SIGNAL;
use crate::ports::config_port::ConfigPort;
use crate::ports::result_port::ResultPort;
use crate::ports::series_port::SeriesPort;

#[derive(Parser, Debug)]
#[command(name = "quantscan", about = "Technical analysis over daily market data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze every configured instrument
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of `<CODE>.csv` files; overrides [data] path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Comma-separated codes; overrides [data] codes
        #[arg(long)]
        codes: Option<String>,
        /// full, quick or scan; overrides [plan] preset
        #[arg(short, long)]
        preset: Option<String>,
        /// JSON lines file; overrides [output] path (stdout when neither is set)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// List the capability catalogue
    Units {
        #[arg(long)]
        category: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            data,
            codes,
            preset,
            output,
            dry_run,
        } => {
            let options = RunOptions {
                data,
                codes,
                preset,
                output,
                dry_run,
            };
            finish(run_analysis(&config, &options))
        }
        Command::Units { category } => finish(run_units(category.as_deref())),
        Command::Validate { config } => finish(run_validate(&config)),
    }
}

/// Command-line overrides for `run`.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub data: Option<PathBuf>,
    pub codes: Option<String>,
    pub preset: Option<String>,
    pub output: Option<PathBuf>,
    pub dry_run: bool,
}

fn finish(outcome: Result<(), QuantscanError>) -> ExitCode {
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, QuantscanError> {
    FileConfigAdapter::from_file(path).map_err(|e| QuantscanError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Install the stderr subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")));
    // A subscriber may already be installed (tests, embedding callers).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Default units plus every configured factor rule.
pub fn build_registry(config: &dyn ConfigPort) -> Result<Registry, QuantscanError> {
    let mut registry = Registry::with_default_units()?;
    let rules = register_rules(config, &mut registry)?;
    if rules > 0 {
        eprintln!("Registered {} factor rule(s)", rules);
    }
    Ok(registry)
}

fn run_analysis(config_path: &Path, options: &RunOptions) -> Result<(), QuantscanError> {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;
    init_logging(config.get_string("logging", "level").as_deref());

    // Stage 2: Validate and build the plan
    validate_plan_config(&config)?;
    let registry = build_registry(&config)?;
    let preset = options
        .preset
        .as_deref()
        .map(str::parse::<Preset>)
        .transpose()?;
    let plan = build_plan(&config, &registry, preset)?;

    // Stage 3: Resolve data source and codes
    let data_dir = match &options.data {
        Some(dir) => dir.clone(),
        None => config
            .get_string("data", "path")
            .map(PathBuf::from)
            .ok_or_else(|| QuantscanError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            })?,
    };
    let source = CsvSeriesAdapter::new(data_dir);
    let codes = resolve_codes(options.codes.as_deref(), &config, &source)?;
    if codes.is_empty() {
        return Err(QuantscanError::Data {
            reason: "no codes configured and no CSV files found".into(),
        });
    }

    if options.dry_run {
        describe_plan(&plan, &registry);
        eprintln!("\nCodes: {}", codes.join(", "));
        eprintln!("\nDry run complete: configuration is valid");
        return Ok(());
    }

    // Stage 4: Load series; a bad file fails only its instrument
    let (start, end) = date_range(&config)?;
    let mut series: BTreeMap<String, Series> = BTreeMap::new();
    let mut failed: BTreeMap<String, AnalysisResult> = BTreeMap::new();
    for code in &codes {
        match source.fetch_series(code, start, end) {
            Ok(s) => {
                series.insert(code.clone(), s);
            }
            Err(e) => {
                eprintln!("warning: skipping {} ({})", code, e);
                failed.insert(code.clone(), AnalysisResult::failed(code.as_str(), e.to_string()));
            }
        }
    }
    if series.is_empty() {
        return Err(QuantscanError::Data {
            reason: "no instrument could be loaded".into(),
        });
    }

    // Stage 5: Analyze
    eprintln!("Analyzing {} instruments...", series.len());
    let engine = Engine::new(Arc::new(registry));
    let mut results = batch_compute(&engine, &series, &plan);
    results.append(&mut failed);

    let summary = BatchSummary::from_results(&results);
    eprintln!("\n=== Summary ===");
    eprintln!("{}", summary);
    for result in results.values() {
        if let Some(label) = result
            .value(Category::Signal, SYNTHESIS_UNIT, PATTERN_SIGNAL)
            .and_then(OutputValue::as_label)
        {
            eprintln!("  {}: {}", result.code(), label);
        }
    }

    // Stage 6: Write records
    let output = options
        .output
        .clone()
        .or_else(|| config.get_string("output", "path").map(PathBuf::from));
    let written = match output {
        Some(path) => {
            let mut sink = JsonLinesAdapter::create(&path)?;
            let n = sink.write_results(results.values())?;
            eprintln!("\nResults written to: {}", path.display());
            n
        }
        None => {
            let mut sink = JsonLinesAdapter::new(io::stdout().lock());
            sink.write_results(results.values())?
        }
    };
    tracing::info!(records = written, "results written");
    Ok(())
}

/// `--codes` first, then `[data] codes`, then every CSV in the data directory.
pub fn resolve_codes(
    code_override: Option<&str>,
    config: &dyn ConfigPort,
    source: &dyn SeriesPort,
) -> Result<Vec<String>, QuantscanError> {
    if let Some(codes) = code_override {
        return Ok(parse_list(codes));
    }
    if let Some(codes) = config.get_string("data", "codes") {
        let codes = parse_list(&codes);
        if !codes.is_empty() {
            return Ok(codes);
        }
    }
    source.list_codes()
}

fn describe_plan(plan: &ExecutionPlan, registry: &Registry) {
    let categories: Vec<String> = plan.categories().iter().map(|c| c.to_string()).collect();
    eprintln!("\nPlan:");
    eprintln!("  categories:   {}", categories.join(", "));
    eprintln!("  max priority: {}", plan.max_priority());
    eprintln!("  min strength: {}", plan.min_strength());
    eprintln!("  lookback:     {}", plan.lookback());
    eprintln!("  synthesis:    {}", plan.synthesize_signals());
    for (unit, params) in plan.overrides() {
        let pairs: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        eprintln!("  params.{}: {}", unit, pairs.join(", "));
    }

    let enabled: Vec<&str> = registry
        .capability_ids()
        .into_iter()
        .filter(|id| {
            registry
                .metadata(id)
                .is_some_and(|meta| plan.capability_enabled(meta))
        })
        .collect();
    eprintln!("\nCapabilities to run ({}):", enabled.len());
    for id in enabled {
        eprintln!("  {}", id);
    }
}

fn run_units(category: Option<&str>) -> Result<(), QuantscanError> {
    let filter = category.map(str::parse::<Category>).transpose()?;
    let registry = Registry::with_default_units()?;

    println!(
        "{:<28} {:<32} {:<10} {:<8} {:>4}  defaults",
        "id", "name", "category", "priority", "min"
    );
    for unit in registry.all() {
        if filter.is_some_and(|c| c != unit.category()) {
            continue;
        }
        for meta in registry.capabilities_of(unit.name()) {
            let defaults: Vec<String> = meta
                .default_params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            println!(
                "{:<28} {:<32} {:<10} {:<8} {:>4}  {}",
                meta.id,
                meta.display_name,
                meta.category,
                meta.priority,
                meta.min_data_points,
                defaults.join(" ")
            );
        }
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), QuantscanError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;
    validate_plan_config(&config)?;

    for section in config.sections() {
        if !section.starts_with("rule.") {
            continue;
        }
        eprintln!("\n[{}]", section);
        for key in ["entry", "exit"] {
            let raw = config.get_string(&section, key).unwrap_or_default();
            match rule_parser::parse(&raw) {
                Ok(rule) => {
                    eprintln!("  {key} parsed: {}", rule);
                    eprintln!("  {key} raw:    {}", raw);
                }
                Err(e) => {
                    eprintln!("  error: {}", e.display_with_context(&raw));
                    return Err(e.into());
                }
            }
        }
    }

    let registry = build_registry(&config)?;
    let plan = build_plan(&config, &registry, None)?;
    describe_plan(&plan, &registry);

    eprintln!("\nConfiguration is valid.");
    Ok(())
}
