use crate::{
    config::Config,
    document::{Document, DocumentFormat},
    engine::Engine,
    oracle::Oracle,
    repair::{RecordSet, as_raw_response, parse_lenient},
    report::{ExtractReport, FailedItem, FolderReport},
    util::{ensure_dir, file_name, list_files, write_json},
};
use anyhow::Result;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};
use unicode_normalization::UnicodeNormalization;

/// Plain text of a routed document: the text layer of every page for PDFs,
/// OCR for images.
pub fn extract_text(cfg: &Config, engine: &dyn Engine, doc: &Document) -> Result<String> {
    let raw = match doc.format {
        DocumentFormat::Paged => {
            let mut text = String::new();
            for page in engine.pdf_text(&doc.path)? {
                text.push_str(&page);
                text.push('\n');
            }
            text
        }
        DocumentFormat::Image => engine.ocr_image(&doc.path, &cfg.extract.ocr_lang)?,
    };
    Ok(normalize_text(cfg, &raw))
}

pub fn normalize_text(cfg: &Config, raw: &str) -> String {
    let mut text = raw.replace("\r\n", "\n");

    if cfg.extract.normalize_unicode {
        text = text.nfkc().collect::<String>();
    }

    if cfg.extract.trim_trailing_whitespace {
        text = text
            .lines()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n");
    }

    text.trim().to_string()
}

/// Oracle output parsed as-is; unparsable text is kept under `raw_response`
/// for the repair stage.
pub fn structure(oracle: &dyn Oracle, text: &str, category: &str) -> Result<Value> {
    let raw = oracle.structure(text, category)?;
    Ok(parse_lenient(&raw))
}

/// One record set for every file directly inside `folder`. Files that fail
/// are logged and left out.
pub fn extract_folder(
    cfg: &Config,
    engine: &dyn Engine,
    oracle: &dyn Oracle,
    folder: &Path,
    category: &str,
) -> Result<(RecordSet, FolderReport)> {
    let mut set = RecordSet::new();
    let mut report = FolderReport {
        category: category.to_string(),
        ..Default::default()
    };

    for path in list_files(folder)? {
        let doc = match Document::open(&path) {
            Ok(doc) => doc,
            Err(err) => {
                warn!("{err:#}");
                report.skipped.push(file_name(&path));
                continue;
            }
        };
        let name = doc.name();
        info!("reading {name}");

        let text = match extract_text(cfg, engine, &doc) {
            Ok(t) => t,
            Err(err) => {
                warn!("error reading {name}: {err:#}");
                report.skipped.push(name);
                continue;
            }
        };
        if text.is_empty() {
            warn!("no text found in {name}");
            report.skipped.push(name);
            continue;
        }

        let entry = match structure(oracle, &text, category) {
            Ok(v) => v,
            Err(err) => {
                warn!("structuring failed for {name}: {err:#}");
                report.skipped.push(name);
                continue;
            }
        };
        if as_raw_response(&entry).is_some() {
            report.raw += 1;
        }
        report.extracted += 1;
        set.insert(name, entry);
    }

    Ok((set, report))
}

/// Walks `organized_docs/<loan_type>/<category>` for each configured category
/// and writes `json_output/<Category_Name>.json` per folder.
pub fn extract_all(cfg: &Config, engine: &dyn Engine, oracle: &dyn Oracle) -> Result<ExtractReport> {
    let base = cfg.loan_dir();
    let mut report = ExtractReport::default();
    if !base.is_dir() {
        warn!("no organized documents at {}; nothing to extract", base.display());
        report.missing = cfg.extract.categories.clone();
        return Ok(report);
    }
    let out_dir = cfg.json_output_dir();
    ensure_dir(&out_dir)?;

    for category in &cfg.extract.categories {
        let folder = base.join(category);
        info!("processing folder: {category}");

        if !folder.is_dir() {
            warn!("folder not found: {}", folder.display());
            report.missing.push(category.clone());
            continue;
        }

        let (set, mut folder_report) = match extract_folder(cfg, engine, oracle, &folder, category)
        {
            Ok(r) => r,
            Err(err) => {
                warn!("{category}: {err:#}");
                report.failed.push(FailedItem {
                    file: category.clone(),
                    error: format!("{err:#}"),
                });
                continue;
            }
        };

        let out_path = out_dir.join(format!("{}.json", category.replace(' ', "_")));
        if let Err(err) = write_json(&out_path, &Value::Object(set)) {
            warn!("{category}: {err:#}; extracted entries not saved");
            report.failed.push(FailedItem {
                file: category.clone(),
                error: format!("{err:#}"),
            });
            continue;
        }
        info!("JSON saved to {}", out_path.display());
        folder_report.output = Some(out_path);
        report.folders.push(folder_report);
    }

    Ok(report)
}
