pub mod external;
pub mod types;

use anyhow::Result;
use std::path::Path;

pub use types::ToolDiag;

/// Local document tooling: page rendering, text layers, OCR.
pub trait Engine {
    fn doctor(&self) -> Result<Vec<ToolDiag>>;
    /// PNG bytes of page 1 rendered at `scale` × 72 dpi.
    fn render_first_page(&self, pdf: &Path, scale: f32) -> Result<Vec<u8>>;
    /// Text layer of every page, in page order.
    fn pdf_text(&self, pdf: &Path) -> Result<Vec<String>>;
    fn ocr_image(&self, image: &Path, lang: &str) -> Result<String>;
}
