//! Validation of the model's reply against the `{html, css, message}` contract.

use serde::Deserialize;

use crate::error::{Error, Result};

/// A contract-conforming edit returned by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEdit {
    pub html: String,
    pub css: String,
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct RawEdit {
    html: Option<serde_json::Value>,
    css: Option<serde_json::Value>,
    message: Option<serde_json::Value>,
}

/// Parse the raw model text.
///
/// Markdown fences are stripped first. If the remainder is not JSON, the
/// outermost `{...}` slice is tried once more. A missing, empty or non-string
/// `html` or `css` is a contract violation.
pub fn parse_response(text: &str) -> Result<ModelEdit> {
    let cleaned = strip_fences(text);
    let raw: RawEdit = match serde_json::from_str(&cleaned) {
        Ok(raw) => raw,
        Err(first) => {
            let slice = object_slice(&cleaned).ok_or_else(|| {
                Error::AiContract(format!("response is not a JSON object: {first}"))
            })?;
            serde_json::from_str(slice)
                .map_err(|e| Error::AiContract(format!("response is not valid JSON: {e}")))?
        }
    };

    let html = required_string(raw.html, "html")?;
    let css = required_string(raw.css, "css")?;
    let message = raw
        .message
        .and_then(|value| value.as_str().map(str::trim).map(str::to_string))
        .filter(|message| !message.is_empty());

    Ok(ModelEdit { html, css, message })
}

fn required_string(value: Option<serde_json::Value>, key: &str) -> Result<String> {
    match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(serde_json::Value::String(_)) => {
            Err(Error::AiContract(format!("\"{key}\" is empty")))
        }
        Some(_) => Err(Error::AiContract(format!("\"{key}\" is not a string"))),
        None => Err(Error::AiContract(format!("missing \"{key}\" key"))),
    }
}

fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

fn object_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
