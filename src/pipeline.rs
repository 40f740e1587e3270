use crate::{
    config::Config,
    engine::Engine,
    extract, mapping,
    oracle::Oracle,
    organize, repair,
    report::{RunReport, StageReport},
    schema,
    util::now_rfc3339,
};
use anyhow::{Result, anyhow};
use std::time::Instant;
use tracing::{error, info};

/// Everything a stage may touch. The oracle is absent when no API key is
/// configured; stages that need it fail before processing anything.
pub struct StageContext<'a> {
    pub cfg: &'a Config,
    pub engine: &'a dyn Engine,
    oracle: Option<&'a dyn Oracle>,
    oracle_error: Option<String>,
}

impl<'a> StageContext<'a> {
    pub fn new(cfg: &'a Config, engine: &'a dyn Engine, oracle: Option<&'a dyn Oracle>) -> Self {
        Self {
            cfg,
            engine,
            oracle,
            oracle_error: None,
        }
    }

    /// Records why the oracle could not be built.
    pub fn oracle_unavailable(mut self, reason: String) -> Self {
        self.oracle = None;
        self.oracle_error = Some(reason);
        self
    }

    pub fn oracle(&self) -> Result<&'a dyn Oracle> {
        self.oracle.ok_or_else(|| {
            anyhow!(
                "oracle unavailable: {}",
                self.oracle_error.as_deref().unwrap_or("not configured")
            )
        })
    }
}

pub trait Stage {
    fn name(&self) -> &'static str;
    /// Returns a JSON summary of what the stage did.
    fn run(&self, ctx: &StageContext) -> Result<serde_json::Value>;
}

/// Stage 1: classify and route input documents.
pub struct Organize;
/// Stage 2: OCR / text layer + structuring per category folder.
pub struct Extract;
/// Stage 3: repair raw-response entries.
pub struct Repair;
/// Stage 4: derive the form schema.
pub struct Schema;
/// Stage 5: map extracted data onto form fields.
pub struct MapFields;

impl Stage for Organize {
    fn name(&self) -> &'static str {
        "organize"
    }
    fn run(&self, ctx: &StageContext) -> Result<serde_json::Value> {
        let oracle = ctx.oracle()?;
        let report = organize::organize(ctx.cfg, ctx.engine, oracle)?;
        Ok(serde_json::to_value(report)?)
    }
}

impl Stage for Extract {
    fn name(&self) -> &'static str {
        "extract"
    }
    fn run(&self, ctx: &StageContext) -> Result<serde_json::Value> {
        let oracle = ctx.oracle()?;
        let report = extract::extract_all(ctx.cfg, ctx.engine, oracle)?;
        Ok(serde_json::to_value(report)?)
    }
}

impl Stage for Repair {
    fn name(&self) -> &'static str {
        "repair"
    }
    fn run(&self, ctx: &StageContext) -> Result<serde_json::Value> {
        let report =
            repair::repair_dir(&ctx.cfg.json_output_dir(), &ctx.cfg.json_corrected_dir())?;
        info!(
            "all JSON files cleaned and saved in {}",
            ctx.cfg.json_corrected_dir().display()
        );
        Ok(serde_json::to_value(report)?)
    }
}

impl Stage for Schema {
    fn name(&self) -> &'static str {
        "schema"
    }
    fn run(&self, ctx: &StageContext) -> Result<serde_json::Value> {
        let oracle = ctx.oracle()?;
        let report = schema::generate(ctx.cfg, oracle)?;
        Ok(serde_json::to_value(report)?)
    }
}

impl Stage for MapFields {
    fn name(&self) -> &'static str {
        "map"
    }
    fn run(&self, ctx: &StageContext) -> Result<serde_json::Value> {
        let oracle = ctx.oracle()?;
        let report = mapping::build_fill_plan(ctx.cfg, oracle)?;
        Ok(serde_json::to_value(report)?)
    }
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// organize -> extract -> repair -> schema -> map
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(Organize),
            Box::new(Extract),
            Box::new(Repair),
            Box::new(Schema),
            Box::new(MapFields),
        ])
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs a single stage with timing. A failed stage is reported, not raised.
    pub fn run_stage(stage: &dyn Stage, ctx: &StageContext) -> StageReport {
        info!("running stage: {}", stage.name());
        let started = Instant::now();
        let result = stage.run(ctx);
        let elapsed_secs = started.elapsed().as_secs_f64();

        match result {
            Ok(detail) => {
                info!("completed {} in {:.2} seconds", stage.name(), elapsed_secs);
                StageReport {
                    stage: stage.name().to_string(),
                    ok: true,
                    error: None,
                    elapsed_secs,
                    detail,
                }
            }
            Err(err) => {
                error!("stage {} failed after {:.2} seconds: {err:#}", stage.name(), elapsed_secs);
                StageReport {
                    stage: stage.name().to_string(),
                    ok: false,
                    error: Some(format!("{err:#}")),
                    elapsed_secs,
                    detail: serde_json::Value::Null,
                }
            }
        }
    }

    /// Every stage in order; later stages run even when an earlier one failed.
    pub fn run(&self, ctx: &StageContext) -> RunReport {
        let started_at = now_rfc3339();
        let started = Instant::now();

        let stages = self
            .stages
            .iter()
            .map(|stage| Self::run_stage(stage.as_ref(), ctx))
            .collect();

        let total_secs = started.elapsed().as_secs_f64();
        info!(
            "all stages finished in {:.2} seconds ({:.2} minutes)",
            total_secs,
            total_secs / 60.0
        );

        RunReport {
            started: started_at,
            finished: now_rfc3339(),
            total_secs,
            stages,
        }
    }
}
