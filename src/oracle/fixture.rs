use super::Oracle;
use crate::document::ImagePayload;
use anyhow::{Result, anyhow};

/// Canned oracle reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// Simulates a transport failure.
    Fail(String),
}

impl Reply {
    fn resolve(&self) -> Result<String> {
        match self {
            Reply::Text(t) => Ok(t.clone()),
            Reply::Fail(msg) => Err(anyhow!("{msg}")),
        }
    }
}

/// Deterministic oracle for tests and dry runs.
///
/// Classification rules match on a byte needle in the image payload;
/// structuring rules match on a substring of the extracted text. The first
/// matching rule wins. Unmatched calls fail.
#[derive(Debug, Clone, Default)]
pub struct FixtureOracle {
    labels: Vec<(Vec<u8>, Reply)>,
    structures: Vec<(String, Reply)>,
    completions: Vec<(String, Reply)>,
}

impl FixtureOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_label(mut self, needle: &[u8], reply: Reply) -> Self {
        self.labels.push((needle.to_vec(), reply));
        self
    }

    pub fn on_structure(mut self, needle: &str, reply: Reply) -> Self {
        self.structures.push((needle.to_string(), reply));
        self
    }

    pub fn on_complete(mut self, needle: &str, reply: Reply) -> Self {
        self.completions.push((needle.to_string(), reply));
        self
    }
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

impl Oracle for FixtureOracle {
    fn classify(&self, image: &ImagePayload) -> Result<String> {
        self.labels
            .iter()
            .find(|(needle, _)| contains_bytes(&image.data, needle))
            .map(|(_, reply)| reply.resolve())
            .unwrap_or_else(|| Err(anyhow!("no fixture label for payload")))
    }

    fn structure(&self, text: &str, _category: &str) -> Result<String> {
        self.structures
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, reply)| reply.resolve())
            .unwrap_or_else(|| Err(anyhow!("no fixture structure for text")))
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        self.completions
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.resolve())
            .unwrap_or_else(|| Err(anyhow!("no fixture completion for prompt")))
    }
}
