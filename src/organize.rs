use crate::{
    classify::{classify_raw, scrape_label},
    config::Config,
    document::{Document, accepts},
    engine::Engine,
    oracle::Oracle,
    report::{FailedItem, OrganizeReport, RoutedDoc},
    route::{KeywordTable, route},
    util::{ensure_dir, file_name, hash_file, list_files},
};
use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

/// Classifies every input file and moves it under
/// `organized_docs/<loan_type>/<category>/`.
pub fn organize(cfg: &Config, engine: &dyn Engine, oracle: &dyn Oracle) -> Result<OrganizeReport> {
    let loan_type = cfg.routing.loan_type.as_str();
    let mut report = OrganizeReport {
        loan_type: loan_type.to_string(),
        ..Default::default()
    };

    let input_dir = cfg.input_dir();
    let files = if input_dir.is_dir() {
        let mut files = list_files(&input_dir)?;
        files.retain(|p| accepts(p, &cfg.routing.input_extensions));
        files
    } else {
        Vec::new()
    };
    if files.is_empty() {
        warn!("no input files found in {}", input_dir.display());
        return Ok(report);
    }

    let product = cfg.product(loan_type);
    if product.is_none() {
        warn!("unknown loan product {loan_type:?}; routing anyway");
    }

    let base = cfg.organized_dir();
    ensure_dir(&base)?;
    let table = KeywordTable::from_config(&cfg.routing.keywords);

    info!("recognizing and organizing documents for {loan_type}");
    info!("input folder: {}", input_dir.display());
    info!("output folder: {}", base.display());

    for path in files {
        let name = file_name(&path);
        let routed = organize_one(cfg, engine, oracle, &table, &path, &base);

        match routed {
            Ok(r) => {
                info!(
                    "{name} -> {loan_type}/{}/{} ({})",
                    r.category,
                    file_name(&r.destination),
                    r.label
                );
                report.routed.push(r);
            }
            Err(err) => {
                warn!("{name}: {err:#}; skipped");
                report.failed.push(FailedItem {
                    file: name,
                    error: format!("{err:#}"),
                });
            }
        }
    }

    if let Some(product) = product {
        for expected in &product.categories {
            if !report.routed.iter().any(|r| r.category.folder() == expected) {
                report.missing_expected.push(expected.clone());
            }
        }
        for r in &report.routed {
            let folder = r.category.folder();
            if !product.categories.iter().any(|c| c == folder)
                && !report.unexpected.iter().any(|u| u == folder)
            {
                report.unexpected.push(folder.to_string());
            }
        }
        if !report.missing_expected.is_empty() {
            warn!(
                "{loan_type} expects documents for: {}",
                report.missing_expected.join(", ")
            );
        }
    }

    info!("all documents organized");
    Ok(report)
}

fn organize_one(
    cfg: &Config,
    engine: &dyn Engine,
    oracle: &dyn Oracle,
    table: &KeywordTable,
    path: &Path,
    base: &Path,
) -> Result<RoutedDoc> {
    let doc = Document::open(path)?;
    let raw = classify_raw(cfg, engine, oracle, &doc)?;
    info!("{} -> {raw}", doc.name());
    let label = scrape_label(&raw);
    let sha256 = hash_file(&doc.path)?;
    let r = route(table, &doc, &label, base, &cfg.routing.loan_type)?;
    Ok(RoutedDoc {
        source: r.source,
        destination: r.destination,
        category: r.category,
        label: r.label,
        sha256,
    })
}
