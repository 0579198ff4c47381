use std::time::Duration;

use async_trait::async_trait;
use serde_json::{
    Map,
    Value,
};

use super::error::ProviderError;
use super::prompt::Prompt;
use super::Provider;

/// Offline provider that tags every value with the target language.
///
/// `{"a": "Hello"}` to `ja` becomes `{"a": "[JA] Hello"}`.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    delay: Option<Duration>,
}

impl MockProvider {
    #[must_use]
    pub const fn new() -> Self {
        Self { delay: None }
    }

    /// Waits `delay` before answering.
    #[must_use]
    pub const fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay) }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let content: Map<String, Value> = serde_json::from_str(&prompt.user)
            .map_err(|err| ProviderError::Protocol(format!("mock expects a JSON object: {err}")))?;
        let tag = prompt.target_language.to_uppercase();

        let tagged: Map<String, Value> = content
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(text) => Value::String(format!("[{tag}] {text}")),
                    other => other,
                };
                (key, value)
            })
            .collect();

        serde_json::to_string(&tagged).map_err(|err| ProviderError::Protocol(err.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use serde_json::json;

    use super::*;

    fn prompt(user: &str) -> Prompt {
        Prompt { system: String::new(), user: user.to_string(), target_language: "zh-TW".to_string() }
    }

    #[tokio::test]
    async fn test_tags_values_with_the_target_language() {
        let raw = MockProvider::new().complete(&prompt(r#"{"app.title":"Title"}"#)).await.unwrap();

        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_that!(value, eq(&json!({ "app.title": "[ZH-TW] Title" })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_honours_the_delay() {
        let provider = MockProvider::with_delay(Duration::from_secs(1));
        let started = tokio::time::Instant::now();

        provider.complete(&prompt("{}")).await.unwrap();

        assert_that!(started.elapsed() >= Duration::from_secs(1), eq(true));
    }

    #[tokio::test]
    async fn test_rejects_non_object_input() {
        let result = MockProvider::new().complete(&prompt("[]")).await;

        assert_that!(result.map_err(|e| matches!(e, ProviderError::Protocol(_))), err(eq(&true)));
    }
}
