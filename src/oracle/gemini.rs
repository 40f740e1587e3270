use super::{Oracle, prompts};
use crate::{config::Config, document::ImagePayload};
use anyhow::{Context, Result, anyhow};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Google Gemini `generateContent` over blocking HTTP.
pub struct GeminiOracle {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl GeminiOracle {
    /// Fails when none of `oracle.api_key_envs` is set.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let (var, api_key) = find_api_key(&cfg.oracle.api_key_envs).ok_or_else(|| {
            anyhow!(
                "no oracle API key: set one of {}",
                cfg.oracle.api_key_envs.join(", ")
            )
        })?;
        debug!("oracle api key from {var}");

        let mut builder = reqwest::blocking::Client::builder();
        // reqwest's blocking client defaults to 30s; 0 means wait indefinitely
        builder = if cfg.oracle.timeout_seconds > 0 {
            builder.timeout(Duration::from_secs(cfg.oracle.timeout_seconds))
        } else {
            builder.timeout(None::<Duration>)
        };
        let client = builder.build().with_context(|| "building HTTP client")?;

        Ok(Self {
            base_url: cfg.oracle.base_url.trim_end_matches('/').to_string(),
            model: cfg.oracle.model.clone(),
            api_key,
            client,
        })
    }

    fn generate(&self, parts: Vec<Part>) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: vec![Content { parts }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("oracle request timed out: {e}")
                } else if e.is_connect() {
                    anyhow!("oracle unreachable at {}: {e}", self.base_url)
                } else {
                    anyhow!("oracle request failed: {e}")
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("oracle returned {}: {}", status.as_u16(), body));
        }

        let parsed: GenerateResponse = response
            .json()
            .with_context(|| "decoding oracle response")?;
        parsed.text()
    }
}

fn find_api_key(vars: &[String]) -> Option<(String, String)> {
    vars.iter().find_map(|var| match std::env::var(var) {
        Ok(val) if !val.trim().is_empty() => Some((var.clone(), val)),
        _ => None,
    })
}

/// Name of the first configured API-key variable that is set.
pub fn api_key_source(cfg: &Config) -> Option<String> {
    find_api_key(&cfg.oracle.api_key_envs).map(|(var, _)| var)
}

impl Oracle for GeminiOracle {
    fn classify(&self, image: &ImagePayload) -> Result<String> {
        let data = base64::engine::general_purpose::STANDARD.encode(&image.data);
        self.generate(vec![
            Part::Text {
                text: prompts::CLASSIFY.to_string(),
            },
            Part::InlineData {
                inline_data: Blob {
                    mime_type: image.mime_type.clone(),
                    data,
                },
            },
        ])
    }

    fn structure(&self, text: &str, category: &str) -> Result<String> {
        self.complete(&prompts::structure(text, category))
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        self.generate(vec![Part::Text {
            text: prompt.to_string(),
        }])
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: Blob },
}

#[derive(Serialize)]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> Result<String> {
        let content = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| anyhow!("oracle response has no candidates"))?;
        Ok(content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"document_type\": "},{"text":"\"pan card\"}"}]}},{"content":{"parts":[{"text":"ignored"}]}}]}"#;
        let resp: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.text().unwrap(), r#"{"document_type": "pan card"}"#);
    }

    #[test]
    fn empty_candidates_is_an_error() {
        let resp: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(resp.text().is_err());
    }

    #[test]
    fn inline_image_serializes_as_inline_data() {
        let part = Part::InlineData {
            inline_data: Blob {
                mime_type: "image/png".into(),
                data: "AAAA".into(),
            },
        };
        let v = serde_json::to_value(&part).unwrap();
        assert_eq!(v["inline_data"]["mime_type"], "image/png");
    }
}
