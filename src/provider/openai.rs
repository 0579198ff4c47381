use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{
    AUTHORIZATION,
    HeaderMap,
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

/// Settings for an OpenAI-compatible chat completions endpoint.
#[derive(Clone, PartialEq)]
pub struct OpenAiConfig {
    /// Name used in logs (`openai`, `groq`, ...)
    pub name: String,
    /// API root, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Provider for OpenAI and services speaking the same API (Groq).
#[derive(Debug)]
pub struct OpenAiCompatibleProvider {
    config: OpenAiConfig,
    endpoint: String,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Ok(Self { config, endpoint, client: build_client()? })
    }

    fn headers(&self) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|_| ProviderError::Config("API key contains invalid characters".to_string()))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let body = request_body(&self.config.model, self.config.temperature, prompt);
        let response = post_json(&self.client, &self.endpoint, self.headers()?, &body).await?;
        extract_content(&response)
    }
}

/// Chat completions request in JSON mode.
fn request_body(model: &str, temperature: f32, prompt: &Prompt) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": prompt.system },
            { "role": "user", "content": prompt.user },
        ],
        "response_format": { "type": "json_object" },
        "temperature": temperature,
    })
}

/// Returns `choices[0].message.content`.
fn extract_content(response: &Value) -> Result<String, ProviderError> {
    let Some(choice) = response.pointer("/choices/0") else {
        return Err(ProviderError::Protocol("response has no choices".to_string()));
    };

    match choice.pointer("/message/content") {
        Some(Value::String(content)) if !content.trim().is_empty() => Ok(content.clone()),
        Some(Value::String(_) | Value::Null) | None => Err(ProviderError::EmptyResponse),
        Some(other) => Err(ProviderError::Protocol(format!("unexpected content type: {other}"))),
    }
}
