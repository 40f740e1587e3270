use crate::{
    config::Config,
    document::{Document, DocumentFormat, ImagePayload},
    engine::Engine,
    oracle::Oracle,
    repair::clean_raw_response,
};
use anyhow::Result;
use serde_json::Value;
use tracing::warn;

/// Stands in for the oracle's answer when the call itself fails.
pub const UNKNOWN_RESPONSE: &str = r#"{"document_type": "unknown"}"#;
pub const UNKNOWN_LABEL: &str = "unknown";

/// Builds the image handed to the oracle: page 1 of a PDF rendered at
/// `classify.render_scale`, or the image file as-is.
pub fn image_payload(cfg: &Config, engine: &dyn Engine, doc: &Document) -> Result<ImagePayload> {
    match doc.format {
        DocumentFormat::Paged => Ok(ImagePayload {
            mime_type: "image/png".to_string(),
            data: engine.render_first_page(&doc.path, cfg.classify.render_scale)?,
        }),
        DocumentFormat::Image => Ok(ImagePayload {
            mime_type: doc
                .media_type
                .clone()
                .unwrap_or_else(|| cfg.classify.fallback_media_type.clone()),
            data: doc.read_bytes()?,
        }),
    }
}

/// Raw oracle response for `doc`. Oracle failures degrade to
/// [`UNKNOWN_RESPONSE`]; only local I/O errors are returned.
pub fn classify_raw(
    cfg: &Config,
    engine: &dyn Engine,
    oracle: &dyn Oracle,
    doc: &Document,
) -> Result<String> {
    let payload = image_payload(cfg, engine, doc)?;
    match oracle.classify(&payload) {
        Ok(text) => Ok(text.trim().to_string()),
        Err(err) => {
            warn!("LLM error for {}: {err:#}", doc.path.display());
            Ok(UNKNOWN_RESPONSE.to_string())
        }
    }
}

pub fn classify(
    cfg: &Config,
    engine: &dyn Engine,
    oracle: &dyn Oracle,
    doc: &Document,
) -> Result<String> {
    Ok(scrape_label(&classify_raw(cfg, engine, oracle, doc)?))
}

/// Best-effort `document_type` out of loosely formatted oracle text.
///
/// A well-formed (optionally fenced) object is read directly; anything else
/// falls back to the text after the last `:` with quotes, braces and
/// backticks removed.
pub fn scrape_label(raw: &str) -> String {
    if let Ok(Value::Object(m)) = serde_json::from_str::<Value>(&clean_raw_response(raw)) {
        if let Some(label) = m.get("document_type").and_then(Value::as_str) {
            let label = label.trim();
            if !label.is_empty() {
                return label.to_string();
            }
        }
    }

    let tail = raw.rsplit(':').next().unwrap_or(raw);
    let label: String = tail
        .chars()
        .filter(|c| !matches!(c, '}' | '{' | '"' | '`'))
        .collect();
    let label = label.trim();
    if label.is_empty() {
        UNKNOWN_LABEL.to_string()
    } else {
        label.to_string()
    }
}
