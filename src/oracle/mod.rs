pub mod fixture;
pub mod gemini;
pub mod prompts;

use crate::document::ImagePayload;
use anyhow::Result;

pub use fixture::{FixtureOracle, Reply};
pub use gemini::GeminiOracle;

/// External vision/language model. Every method returns the model's raw text;
/// callers decide how leniently to parse it.
pub trait Oracle {
    /// Expected to answer with `{"document_type": "<type>"}`.
    fn classify(&self, image: &ImagePayload) -> Result<String>;
    /// Expected to answer with a JSON object (or array) of extracted fields.
    fn structure(&self, text: &str, category: &str) -> Result<String>;
    /// Free-form prompt, used by the form schema and field mapping stages.
    fn complete(&self, prompt: &str) -> Result<String>;
}
