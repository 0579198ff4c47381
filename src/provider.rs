//! Translation provider boundary.
//!
//! A [`Provider`] turns a prompt into raw completion text. Everything that
//! makes that text safe to merge (size limits, parsing, repair, whitelisting)
//! lives in [`ProviderGateway`].

/// Error taxonomy for providers and the gateway
mod error;
/// Request validation, circuit breaker, parse and whitelist pipeline
mod gateway;
/// Google Gemini backend
mod gemini;
/// Shared HTTP helpers
mod http;
/// Offline backend
mod mock;
/// OpenAI-compatible chat completions backend (OpenAI, Groq)
mod openai;
/// Prompt construction
mod prompt;
/// Fence stripping and structural JSON repair
pub mod repair;

use std::sync::Arc;

use async_trait::async_trait;

pub use error::{
    ErrorKind,
    GatewayError,
    ProviderError,
};
pub use gateway::{
    DEFAULT_MAX_KEYS_PER_REQUEST,
    ProviderGateway,
    TranslationRequest,
    whitelist,
};
pub use gemini::{
    GeminiConfig,
    GeminiProvider,
};
pub use mock::MockProvider;
pub use openai::{
    OpenAiCompatibleProvider,
    OpenAiConfig,
};
pub use prompt::{
    DEFAULT_CONTEXT,
    Prompt,
    build_prompt,
};

use crate::config::{
    ProviderKind,
    ProviderSettings,
};

/// An external translation capability.
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Sends the prompt and returns the raw completion text.
    async fn complete(&self, prompt: &Prompt) -> Result<String, ProviderError>;
}

/// Builds the provider described by `settings`.
///
/// API keys are resolved through `env` so callers decide where they come from.
pub fn from_settings<F>(settings: &ProviderSettings, env: F) -> Result<Arc<dyn Provider>, ProviderError>
where
    F: Fn(&str) -> Option<String>,
{
    let kind = settings.kind;
    if kind == ProviderKind::Mock {
        return Ok(Arc::new(MockProvider::new()));
    }

    let key_var = settings.api_key_env.clone().unwrap_or_else(|| kind.default_api_key_env().to_string());
    let api_key = env(&key_var)
        .filter(|key| !key.trim().is_empty())
        .ok_or(ProviderError::MissingApiKey(key_var))?;
    let base_url = settings.base_url.clone().unwrap_or_else(|| kind.default_base_url().to_string());
    let model = settings.model.clone().unwrap_or_else(|| kind.default_model().to_string());

    tracing::debug!(provider = kind.as_str(), model = %model, base_url = %base_url, "Building provider");

    let provider: Arc<dyn Provider> = match kind {
        ProviderKind::OpenAi | ProviderKind::Groq => Arc::new(OpenAiCompatibleProvider::new(OpenAiConfig {
            name: kind.as_str().to_string(),
            base_url,
            api_key,
            model,
            temperature: settings.temperature.unwrap_or_else(|| kind.default_temperature()),
        })?),
        ProviderKind::Gemini => {
            Arc::new(GeminiProvider::new(GeminiConfig { base_url, api_key, model })?)
        }
        ProviderKind::Mock => Arc::new(MockProvider::new()),
    };

    Ok(provider)
}
