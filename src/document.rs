use crate::util::{file_name, lower_ext};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Image,
    /// Paginated page format (PDF).
    Paged,
}

/// A scanned upload on disk. Bytes are read on demand.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub format: DocumentFormat,
    /// Guessed from the extension; `None` when undetected.
    pub media_type: Option<String>,
}

impl Document {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(anyhow!("not a file: {}", path.display()));
        }
        let format = match lower_ext(path).as_deref() {
            Some("pdf") => DocumentFormat::Paged,
            _ => DocumentFormat::Image,
        };
        let media_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string());
        Ok(Self {
            path: path.to_path_buf(),
            format,
            media_type,
        })
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))
    }

    pub fn name(&self) -> String {
        file_name(&self.path)
    }

    /// Original extension including the dot, case preserved (`.JPG`).
    pub fn dotted_ext(&self) -> String {
        self.path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default()
    }
}

/// Image bytes handed to the classification oracle.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// True when `path` carries one of the accepted input extensions.
pub fn accepts(path: &Path, extensions: &[String]) -> bool {
    match lower_ext(path) {
        Some(ext) => extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)),
        None => false,
    }
}
