use crate::{
    config::Config,
    engine::{Engine, external::ExternalEngine},
    flatten::flatten,
    oracle::{GeminiOracle, Oracle, gemini::api_key_source},
    pipeline::{self, Pipeline, Stage, StageContext},
    util::{ensure_dir, read_json, write_json},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "loan-docflow")]
#[command(about = "Loan application document pipeline (classify, route, extract, repair, map)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./loan-docflow.toml if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Override paths.project_root.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify every input document and move it into its category folder.
    Organize {},
    /// Extract structured JSON per category folder.
    Extract {},
    /// Re-parse raw-response entries in the extracted JSON.
    Repair {},
    /// Derive a JSON schema from the HTML form.
    Schema {},
    /// Map extracted data onto form fields and write the fill plan.
    Map {},
    /// All stages in order.
    Run {},
    Doctor {},
    /// Print the flattened form of a JSON file.
    Flatten {
        #[arg(long)]
        input: PathBuf,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let mut cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    if let Some(root) = &args.root {
        cfg.paths.project_root = root.display().to_string();
    }

    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match &args.cmd {
        Command::Organize {} => run_stage(&cfg, &pipeline::Organize),
        Command::Extract {} => run_stage(&cfg, &pipeline::Extract),
        Command::Repair {} => run_stage(&cfg, &pipeline::Repair),
        Command::Schema {} => run_stage(&cfg, &pipeline::Schema),
        Command::Map {} => run_stage(&cfg, &pipeline::MapFields),
        Command::Run {} => run(&cfg),
        Command::Doctor {} => doctor(&cfg),
        Command::Flatten { input } => flatten_file(input),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("loan-docflow.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(false).boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    Some(cfg.resolve("loan-docflow.log"))
}

fn context<'a>(
    cfg: &'a Config,
    engine: &'a ExternalEngine,
    oracle: &'a Result<GeminiOracle>,
) -> StageContext<'a> {
    match oracle {
        Ok(o) => StageContext::new(cfg, engine, Some(o as &dyn Oracle)),
        Err(err) => StageContext::new(cfg, engine, None).oracle_unavailable(format!("{err:#}")),
    }
}

fn run_stage(cfg: &Config, stage: &dyn Stage) -> Result<()> {
    let engine = ExternalEngine::new(cfg);
    let oracle = GeminiOracle::from_config(cfg);
    let ctx = context(cfg, &engine, &oracle);

    let report = Pipeline::run_stage(stage, &ctx);
    if cfg.global.print_summary {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    match report.error {
        Some(err) => Err(anyhow!("stage {} failed: {err}", report.stage)),
        None => Ok(()),
    }
}

fn run(cfg: &Config) -> Result<()> {
    let engine = ExternalEngine::new(cfg);
    let oracle = GeminiOracle::from_config(cfg);
    if let Err(err) = &oracle {
        warn!("{err:#}; oracle-backed stages will fail");
    }
    let ctx = context(cfg, &engine, &oracle);

    let pipeline = Pipeline::standard();
    info!("stages: {}", pipeline.stage_names().join(" -> "));
    let report = pipeline.run(&ctx);

    let report_path = if cfg.output.write_run_report {
        let path = cfg.resolve(&cfg.output.run_report_file);
        write_json(&path, &report)?;
        info!("run report saved at {}", path.display());
        Some(path)
    } else {
        None
    };

    let failed: Vec<&str> = report
        .stages
        .iter()
        .filter(|s| !s.ok)
        .map(|s| s.stage.as_str())
        .collect();
    if !failed.is_empty() {
        warn!("failed stages: {}", failed.join(", "));
    }

    if cfg.global.print_summary {
        let stages: Vec<Value> = report
            .stages
            .iter()
            .map(|s| {
                serde_json::json!({
                    "stage": s.stage,
                    "ok": s.ok,
                    "elapsed_secs": s.elapsed_secs,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "stages": stages,
                "total_secs": report.total_secs,
                "total_minutes": report.total_secs / 60.0,
                "report": report_path,
            }))?
        );
    }

    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    let engine = ExternalEngine::new(cfg);
    let tools = engine.doctor()?;
    let api_key_env = api_key_source(cfg);
    if api_key_env.is_none() {
        warn!(
            "no oracle API key set (checked {})",
            cfg.oracle.api_key_envs.join(", ")
        );
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "tools": tools,
            "api_key_env": api_key_env,
            "model": cfg.oracle.model,
            "loan_type": cfg.routing.loan_type,
            "known_product": cfg.product(&cfg.routing.loan_type).is_some(),
        }))?
    );
    Ok(())
}

fn flatten_file(input: &Path) -> Result<()> {
    let value: Value = read_json(input)?;
    println!("{}", serde_json::to_string_pretty(&flatten(&value))?);
    Ok(())
}
