use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{
    HeaderMap,
    HeaderName,
    HeaderValue,
};
use serde_json::{
    Value,
    json,
};

use super::error::ProviderError;
use super::http::{
    build_client,
    post_json,
};
use super::prompt::Prompt;
use super::Provider;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Settings for the Gemini `generateContent` endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug)]
pub struct GeminiProvider {
    config: GeminiConfig,
    endpoint: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );
        Ok(Self { config, endpoint, client: build_client()? })
    }

    fn headers(&self) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.config.api_key)
            .map_err(|_| ProviderError::Config("API key contains invalid characters".to_string()))?;
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);
        Ok(headers)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let body = request_body(prompt);
        let response = post_json(&self.client, &self.endpoint, self.headers()?, &body).await?;
        extract_text(&response)
    }
}

fn request_body(prompt: &Prompt) -> Value {
    json!({
        "systemInstruction": { "parts": [{ "text": prompt.system }] },
        "contents": [{ "role": "user", "parts": [{ "text": prompt.user }] }],
        "generationConfig": { "responseMimeType": "application/json" },
    })
}

/// Joins the text parts of the first candidate.
fn extract_text(response: &Value) -> Result<String, ProviderError> {
    let Some(candidate) = response.pointer("/candidates/0") else {
        if let Some(reason) = response.pointer("/promptFeedback/blockReason").and_then(Value::as_str) {
            return Err(ProviderError::Protocol(format!("prompt was blocked: {reason}")));
        }
        return Err(ProviderError::Protocol("response has no candidates".to_string()));
    };

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| parts.iter().filter_map(|part| part.get("text").and_then(Value::as_str)).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(text)
}
