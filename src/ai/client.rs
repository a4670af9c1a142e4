//! HTTP client for the Gemini generative language API.
//!
//! [`TextService`] is the seam the coordinator talks through; [`GeminiClient`]
//! is the production implementation on top of [`reqwest`].

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::AiConfig;
use crate::error::{Error, Result};

/// A service that turns one prompt into one block of text.
#[async_trait]
pub trait TextService: Send + Sync {
    async fn generate(&self, config: &AiConfig, prompt: &str) -> Result<String>;
}

/// A selectable model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

/// Client for `generateContent` and the model listing.
#[derive(Debug, Clone, Default)]
pub struct GeminiClient {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<RemoteModel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteModel {
    name: String,
    display_name: Option<String>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

impl GeminiClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing [`reqwest::Client`] and its connection pool.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Models that support `generateContent`, ids without the `models/`
    /// prefix, sorted newest-first by id.
    pub async fn list_models(&self, config: &AiConfig) -> Result<Vec<ModelInfo>> {
        if !config.has_credential() {
            return Err(Error::MissingApiKey);
        }
        let url = format!("{}/v1/models", config.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[("key", config.api_key.as_str())])
            .send()
            .await?;
        let list: ModelList = Self::ensure_success(response).await?.json().await?;
        Ok(usable_models(list))
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read body: {e}>"));
        Err(Error::AiRequest(format!("service returned {status}: {body}")))
    }
}

#[async_trait]
impl TextService for GeminiClient {
    async fn generate(&self, config: &AiConfig, prompt: &str) -> Result<String> {
        if !config.has_credential() {
            return Err(Error::MissingApiKey);
        }
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        tracing::debug!(model = %config.model, prompt_len = prompt.len(), "calling text service");
        let response = self
            .client
            .post(url)
            .query(&[("key", config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let parsed: GenerateResponse = Self::ensure_success(response).await?.json().await?;
        candidate_text(parsed)
    }
}

fn candidate_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(Error::AiRequest("service returned no text".to_string()));
    }
    Ok(text)
}

fn usable_models(list: ModelList) -> Vec<ModelInfo> {
    let mut models: Vec<ModelInfo> = list
        .models
        .into_iter()
        .filter(|m| {
            m.supported_generation_methods
                .iter()
                .any(|method| method == "generateContent")
        })
        .map(|m| {
            let id = m.name.strip_prefix("models/").unwrap_or(&m.name).to_string();
            let name = m.display_name.unwrap_or_else(|| id.clone());
            ModelInfo { id, name }
        })
        .collect();
    models.sort_by(|a, b| b.id.cmp(&a.id));
    models
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"html\":"},{"text":"1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(candidate_text(response).unwrap(), "{\"html\":1}");
    }

    #[test]
    fn test_candidate_text_empty_is_error() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(candidate_text(response), Err(Error::AiRequest(_))));
    }

    #[test]
    fn test_usable_models_filters_and_sorts() {
        let list: ModelList = serde_json::from_str(
            r#"{"models":[
                {"name":"models/gemini-1.5-flash","displayName":"Gemini 1.5 Flash","supportedGenerationMethods":["generateContent"]},
                {"name":"models/embedding-001","supportedGenerationMethods":["embedContent"]},
                {"name":"models/gemini-2.0-flash","supportedGenerationMethods":["generateContent","countTokens"]}
            ]}"#,
        )
        .unwrap();
        let models = usable_models(list);
        let ids: Vec<_> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["gemini-2.0-flash", "gemini-1.5-flash"]);
        assert_eq!(models[0].name, "gemini-2.0-flash");
        assert_eq!(models[1].name, "Gemini 1.5 Flash");
    }

    #[tokio::test]
    async fn test_generate_without_key_makes_no_request() {
        let client = GeminiClient::new();
        let config = AiConfig::default().endpoint("http://127.0.0.1:9");
        assert!(matches!(
            client.generate(&config, "hi").await,
            Err(Error::MissingApiKey)
        ));
    }
}
