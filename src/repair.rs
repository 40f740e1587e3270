use crate::{
    report::RepairReport,
    util::{ensure_dir, file_name, list_files, read_json, write_json},
};
use anyhow::Result;
use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

pub const RAW_RESPONSE_KEY: &str = "raw_response";

/// File name -> extracted entry, one set per category folder.
pub type RecordSet = Map<String, Value>;

pub fn raw_wrapper(text: &str) -> Value {
    let mut m = Map::new();
    m.insert(RAW_RESPONSE_KEY.to_string(), Value::String(text.to_string()));
    Value::Object(m)
}

/// Parse as JSON; on failure keep the text under `raw_response`.
pub fn parse_lenient(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| raw_wrapper(text))
}

/// The wrapped text when `entry` is exactly `{"raw_response": <string>}`.
pub fn as_raw_response(entry: &Value) -> Option<&str> {
    match entry {
        Value::Object(m) if m.len() == 1 => m.get(RAW_RESPONSE_KEY).and_then(Value::as_str),
        _ => None,
    }
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)```(?:json)?").expect("static regex"))
}

/// Strips markdown fences (```` ```json ````, ```` ``` ````) and surrounding
/// whitespace. Cleaning cleaned text is a no-op.
pub fn clean_raw_response(text: &str) -> String {
    let mut cleaned = fence_re().replace_all(text, "").into_owned();
    while cleaned.contains("```") {
        cleaned = cleaned.replace("```", "");
    }
    cleaned.trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Already structured; passed through.
    Untouched,
    /// Wrapper parsed after cleaning.
    Repaired,
    /// Wrapper kept, text cleaned.
    StillRaw,
}

pub fn repair_entry(entry: Value) -> (Value, EntryOutcome) {
    let Some(raw) = as_raw_response(&entry) else {
        return (entry, EntryOutcome::Untouched);
    };
    let cleaned = clean_raw_response(raw);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(parsed) => (parsed, EntryOutcome::Repaired),
        Err(_) => (raw_wrapper(&cleaned), EntryOutcome::StillRaw),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetStats {
    pub untouched: usize,
    pub repaired: usize,
    pub still_raw: Vec<String>,
}

/// Repairs every entry of one record set, preserving key order.
pub fn repair_set(set: RecordSet) -> (RecordSet, SetStats) {
    let mut stats = SetStats::default();
    let mut out = Map::with_capacity(set.len());
    for (name, entry) in set {
        let (fixed, outcome) = repair_entry(entry);
        match outcome {
            EntryOutcome::Untouched => stats.untouched += 1,
            EntryOutcome::Repaired => stats.repaired += 1,
            EntryOutcome::StillRaw => {
                warn!("invalid JSON in {name}, keeping as raw text");
                stats.still_raw.push(name.clone());
            }
        }
        out.insert(name, fixed);
    }
    (out, stats)
}

/// Repairs every `*.json` record set in `input_dir` into `output_dir` under
/// the same file name. Unreadable files are skipped.
pub fn repair_dir(input_dir: &Path, output_dir: &Path) -> Result<RepairReport> {
    if !input_dir.is_dir() {
        warn!("input folder not found: {}; nothing to repair", input_dir.display());
        return Ok(RepairReport::default());
    }
    ensure_dir(output_dir)?;

    let mut report = RepairReport::default();
    let mut files = list_files(input_dir)?;
    files.retain(|p| p.extension().is_some_and(|e| e == "json"));

    for path in files {
        let name = file_name(&path);
        info!("processing {name}");

        let set: RecordSet = match read_json::<Value>(&path) {
            Ok(Value::Object(m)) => m,
            Ok(_) => {
                warn!("{name} is not a JSON object; skipped");
                report.skipped.push(name);
                continue;
            }
            Err(err) => {
                warn!("{name}: {err:#}; skipped");
                report.skipped.push(name);
                continue;
            }
        };

        let (fixed, stats) = repair_set(set);
        let out_path = output_dir.join(&name);
        if let Err(err) = write_json(&out_path, &Value::Object(fixed)) {
            warn!("{name}: {err:#}; skipped");
            report.skipped.push(name);
            continue;
        }
        info!("saved corrected JSON -> {}", out_path.display());

        report.files += 1;
        report.untouched += stats.untouched;
        report.repaired += stats.repaired;
        report
            .still_raw
            .extend(stats.still_raw.into_iter().map(|e| format!("{name}:{e}")));
    }

    Ok(report)
}
