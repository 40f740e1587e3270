#![allow(dead_code)]

use anyhow::Result;
use loan_docflow::{
    config::Config,
    engine::{Engine, ToolDiag},
};
use std::path::Path;

/// Treats every file as text: rendering returns the raw bytes, the PDF text
/// layer splits on form feeds, OCR returns the file contents.
pub struct StubEngine;

impl Engine for StubEngine {
    fn doctor(&self) -> Result<Vec<ToolDiag>> {
        Ok(Vec::new())
    }

    fn render_first_page(&self, pdf: &Path, _scale: f32) -> Result<Vec<u8>> {
        Ok(std::fs::read(pdf)?)
    }

    fn pdf_text(&self, pdf: &Path) -> Result<Vec<String>> {
        let raw = std::fs::read_to_string(pdf)?;
        Ok(raw.split('\u{c}').map(str::to_string).collect())
    }

    fn ocr_image(&self, image: &Path, _lang: &str) -> Result<String> {
        Ok(std::fs::read_to_string(image)?)
    }
}

pub fn config_at(root: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.paths.project_root = root.display().to_string();
    cfg
}

pub fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, contents).expect("write file");
}
