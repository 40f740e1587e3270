use crate::{
    config::Config,
    oracle::{Oracle, prompts},
    repair::{as_raw_response, clean_raw_response, parse_lenient},
    report::SchemaReport,
    util::write_json,
};
use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

/// Asks the oracle for a nested JSON model of the HTML form at `form_path`.
pub fn derive_schema(oracle: &dyn Oracle, form_path: &Path, loan_type: &str) -> Result<Value> {
    if !form_path.is_file() {
        return Err(anyhow!("HTML form not found at {}", form_path.display()));
    }
    let html = std::fs::read_to_string(form_path)
        .with_context(|| format!("reading {}", form_path.display()))?;

    let raw = oracle.complete(&prompts::form_schema(&html, loan_type))?;
    let schema = parse_lenient(&clean_raw_response(&raw));
    if as_raw_response(&schema).is_some() {
        warn!("form schema is not valid JSON; saving raw output instead");
    }
    Ok(schema)
}

pub fn generate(cfg: &Config, oracle: &dyn Oracle) -> Result<SchemaReport> {
    let form = cfg.form_path();
    let schema = derive_schema(oracle, &form, &cfg.routing.loan_type)?;
    let out = cfg.schema_path();
    write_json(&out, &schema)?;
    info!("JSON schema saved at {}", out.display());
    Ok(SchemaReport {
        form,
        parsed: as_raw_response(&schema).is_none(),
        schema: out,
    })
}
