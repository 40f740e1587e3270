use crate::{config::Keywords, document::Document, util::ensure_dir};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "KYC Docs")]
    Kyc,
    #[serde(rename = "Income Docs")]
    Income,
    #[serde(rename = "Property Docs")]
    Property,
    #[serde(rename = "Business Proof")]
    Business,
    #[serde(rename = "Others")]
    Others,
}

impl Category {
    /// Matching priority; `Others` is the fallback, never matched by keyword.
    pub const ALL: [Category; 5] = [
        Category::Kyc,
        Category::Income,
        Category::Property,
        Category::Business,
        Category::Others,
    ];

    /// Folder name under `organized_docs/<loan_type>/`.
    pub fn folder(&self) -> &'static str {
        match self {
            Category::Kyc => "KYC Docs",
            Category::Income => "Income Docs",
            Category::Property => "Property Docs",
            Category::Business => "Business Proof",
            Category::Others => "Others",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

/// Lowercase keyword phrases per keyword-bearing category, in priority order.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    entries: Vec<(Category, Vec<String>)>,
}

impl KeywordTable {
    pub fn from_config(kw: &Keywords) -> Self {
        let kyc = kw
            .kyc_identity
            .iter()
            .chain(&kw.kyc_address)
            .chain(&kw.kyc_age)
            .cloned()
            .collect::<Vec<_>>();
        let entries = vec![
            (Category::Kyc, kyc),
            (Category::Income, kw.income.clone()),
            (Category::Property, kw.property.clone()),
            (Category::Business, kw.business.clone()),
        ]
        .into_iter()
        .map(|(cat, words)| {
            let words: Vec<String> = words
                .into_iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect();
            (cat, words)
        })
        .collect();
        Self { entries }
    }

    /// First category whose keyword occurs anywhere in the lower-cased label.
    pub fn categorize(&self, label: &str) -> Category {
        let label = label.to_lowercase();
        self.entries
            .iter()
            .find(|(_, words)| words.iter().any(|w| label.contains(w.as_str())))
            .map(|(cat, _)| *cat)
            .unwrap_or(Category::Others)
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::from_config(&Keywords::default())
    }
}

/// Lower-case, spaces to underscores, drop everything outside `[a-z0-9_]`.
/// An empty result becomes `unknown`.
pub fn sanitize_label(label: &str) -> String {
    let clean: String = label
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();
    if clean.is_empty() {
        "unknown".to_string()
    } else {
        clean
    }
}

/// First free `<name><ext>`, `<name>_2<ext>`, `<name>_3<ext>`, ... in `dir`.
pub fn unique_destination(dir: &Path, name: &str, ext: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{name}{ext}"));
    let mut counter = 1u32;
    while candidate.exists() {
        counter += 1;
        candidate = dir.join(format!("{name}_{counter}{ext}"));
    }
    candidate
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Routed {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: Category,
    pub label: String,
}

/// Moves `doc` into `<category_root>/<loan_type>/<category>/<sanitized_label>[_n].<ext>`.
///
/// The source file no longer exists afterwards.
pub fn route(
    table: &KeywordTable,
    doc: &Document,
    label: &str,
    category_root: &Path,
    loan_type: &str,
) -> Result<Routed> {
    let category = table.categorize(label);
    let folder = category_root.join(loan_type).join(category.folder());
    ensure_dir(&folder)?;

    let destination = unique_destination(&folder, &sanitize_label(label), &doc.dotted_ext());
    move_file(&doc.path, &destination)?;

    Ok(Routed {
        source: doc.path.clone(),
        destination,
        category,
        label: label.to_string(),
    })
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) => {
            // rename fails across filesystems; fall back to copy + remove
            debug!("rename {} failed ({err}); copying", from.display());
            std::fs::copy(from, to).with_context(|| {
                format!("copying {} -> {}", from.display(), to.display())
            })?;
            if let Err(err) = std::fs::remove_file(from) {
                warn!("copied but could not remove {}: {err}", from.display());
                return Err(anyhow!(
                    "source left behind after copy: {}",
                    from.display()
                ));
            }
            Ok(())
        }
    }
}
