use crate::{
    config::Config,
    flatten::{FlatRecord, flatten},
    oracle::{Oracle, prompts},
    report::MapReport,
    util::{file_name, list_files, read_json, write_json},
};
use anyhow::{Context, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Flattens every `*.json` record set in `dir` (name order) into one map.
/// Later files overwrite earlier keys.
pub fn load_user_data(dir: &Path) -> Result<FlatRecord> {
    if !dir.is_dir() {
        warn!("no corrected JSON at {}; no user data", dir.display());
        return Ok(FlatRecord::new());
    }
    let mut data = FlatRecord::new();
    for path in list_files(dir)? {
        if path.extension().is_none_or(|e| e != "json") {
            continue;
        }
        match read_json::<Value>(&path) {
            Ok(v) => data.extend(flatten(&v)),
            Err(err) => warn!("{}: {err:#}; skipped", file_name(&path)),
        }
    }
    Ok(data)
}

fn name_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"name="([^"]+)""#).expect("static regex"))
}

fn object_span_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}

/// `name="..."` attribute values in document order, first occurrence only.
pub fn html_field_names(html: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for cap in name_attr_re().captures_iter(html) {
        let name = &cap[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// HTML field name -> user-data key, from the outermost `{...}` in `raw`.
/// Anything unparsable yields an empty mapping.
pub fn parse_mapping(raw: &str) -> Map<String, Value> {
    let parsed = object_span_re()
        .find(raw)
        .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok());
    match parsed {
        Some(Value::Object(m)) => m,
        _ => {
            warn!("field mapping parse error; using empty mapping");
            Map::new()
        }
    }
}

/// Values a form field should not be filled with.
pub fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// HTML field name -> value for every mapped key with a non-blank value.
pub fn resolve(mapping: &Map<String, Value>, user_data: &FlatRecord) -> FlatRecord {
    let mut plan = FlatRecord::new();
    for (field, key) in mapping {
        let Some(key) = key.as_str() else {
            continue;
        };
        match user_data.get(key) {
            Some(v) if !is_blank(v) => {
                info!("filled {field:?} -> {v}");
                plan.insert(field.clone(), v.clone());
            }
            _ => {}
        }
    }
    plan
}

/// Maps form fields onto extracted data and writes the fill plan consumed by
/// the browser driver.
pub fn build_fill_plan(cfg: &Config, oracle: &dyn Oracle) -> Result<MapReport> {
    let user_data = load_user_data(&cfg.json_corrected_dir())?;

    let schema_path = cfg.schema_path();
    let schema: Value = read_json(&schema_path)
        .with_context(|| format!("loading form schema {}", schema_path.display()))?;
    let schema_keys: Vec<String> = flatten(&schema).keys().cloned().collect();

    let form_path = cfg.form_path();
    let html = std::fs::read_to_string(&form_path)
        .with_context(|| format!("reading {}", form_path.display()))?;
    let fields = html_field_names(&html);

    let data_keys: Vec<String> = user_data.keys().cloned().collect();
    let raw = oracle.complete(&prompts::field_mapping(&fields, &schema_keys, &data_keys))?;
    let mapping = parse_mapping(&raw);

    let plan = resolve(&mapping, &user_data);
    let filled = plan.len();
    let out = cfg.fill_plan_path();
    write_json(&out, &Value::Object(plan))?;
    info!("fill plan saved at {}", out.display());

    Ok(MapReport {
        html_fields: fields.len(),
        data_keys: data_keys.len(),
        mapped: mapping.len(),
        filled,
        fill_plan: out,
    })
}
