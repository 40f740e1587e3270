use crate::route::Category;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedDoc {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: Category,
    pub label: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedItem {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizeReport {
    pub loan_type: String,
    pub routed: Vec<RoutedDoc>,
    pub failed: Vec<FailedItem>,
    /// Expected by the loan product but received no documents.
    pub missing_expected: Vec<String>,
    /// Received documents the loan product does not list.
    pub unexpected: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderReport {
    pub category: String,
    pub extracted: usize,
    /// Entries stored as `raw_response` wrappers.
    pub raw: usize,
    pub skipped: Vec<String>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractReport {
    pub folders: Vec<FolderReport>,
    pub missing: Vec<String>,
    /// Folders that could not be read or whose output could not be written.
    pub failed: Vec<FailedItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepairReport {
    pub files: usize,
    pub untouched: usize,
    pub repaired: usize,
    /// `<file>:<entry>` still unparsable after cleaning.
    pub still_raw: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaReport {
    pub form: PathBuf,
    pub schema: PathBuf,
    pub parsed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapReport {
    pub html_fields: usize,
    pub data_keys: usize,
    pub mapped: usize,
    pub filled: usize,
    pub fill_plan: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    pub elapsed_secs: f64,
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started: String,
    pub finished: String,
    pub total_secs: f64,
    pub stages: Vec<StageReport>,
}
