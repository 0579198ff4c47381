use std::sync::Arc;

use serde_json::{
    Map,
    Value,
};

use super::error::GatewayError;
use super::prompt::build_prompt;
use super::repair::parse_lenient;
use super::Provider;
use crate::types::MissingKeysMap;

/// Default number of entries allowed in a single provider call.
pub const DEFAULT_MAX_KEYS_PER_REQUEST: usize = 50;

const MIN_LANGUAGE_LEN: usize = 2;

/// One batch of missing entries bound for the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub source_lang: String,
    pub target_lang: String,
    pub content: MissingKeysMap,
    /// Free-form hint about where the strings are used.
    pub context: Option<String>,
}

impl TranslationRequest {
    #[must_use]
    pub fn new(
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
        content: MissingKeysMap,
    ) -> Self {
        Self {
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            content,
            context: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: Option<impl Into<String>>) -> Self {
        self.context = context.map(Into::into);
        self
    }

    /// Parses an untyped request body of the form
    /// `{ "sourceLang", "targetLang", "content": { path: string }, "context"? }`.
    ///
    /// # Errors
    /// [`GatewayError::InvalidRequest`] when a field is missing or has the wrong type.
    pub fn from_json(body: &Value) -> Result<Self, GatewayError> {
        let Some(object) = body.as_object() else {
            return Err(GatewayError::InvalidRequest("request body must be an object".into()));
        };

        let source_lang = required_str(object, "sourceLang")?;
        let target_lang = required_str(object, "targetLang")?;

        let Some(Value::Object(raw_content)) = object.get("content") else {
            return Err(GatewayError::InvalidRequest("content must be an object".into()));
        };
        let mut content = MissingKeysMap::new();
        for (key, value) in raw_content {
            let Value::String(text) = value else {
                return Err(GatewayError::InvalidRequest(format!(
                    "content value for '{key}' must be a string"
                )));
            };
            content.insert(key.clone(), text.clone());
        }

        let context = match object.get("context") {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(_) => {
                return Err(GatewayError::InvalidRequest("context must be a string".into()));
            }
        };

        let request = Self { source_lang, target_lang, content, context };
        request.validate()?;
        Ok(request)
    }

    /// # Errors
    /// [`GatewayError::InvalidRequest`] when a language code is too short.
    pub fn validate(&self) -> Result<(), GatewayError> {
        for (field, value) in [("sourceLang", &self.source_lang), ("targetLang", &self.target_lang)] {
            if value.trim().chars().count() < MIN_LANGUAGE_LEN {
                return Err(GatewayError::InvalidRequest(format!(
                    "{field} must be at least {MIN_LANGUAGE_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

fn required_str(object: &Map<String, Value>, field: &str) -> Result<String, GatewayError> {
    match object.get(field) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(GatewayError::InvalidRequest(format!("{field} must be a string"))),
        None => Err(GatewayError::InvalidRequest(format!("{field} is required"))),
    }
}

/// Bounded, validated access to a [`Provider`].
///
/// Holds no state between calls.
#[derive(Debug, Clone)]
pub struct ProviderGateway {
    provider: Arc<dyn Provider>,
    max_keys: usize,
}

impl ProviderGateway {
    #[must_use]
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider, max_keys: DEFAULT_MAX_KEYS_PER_REQUEST }
    }

    /// Sets the circuit-breaker ceiling. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys.max(1);
        self
    }

    #[must_use]
    pub const fn max_keys(&self) -> usize {
        self.max_keys
    }

    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Translates one batch.
    ///
    /// The returned key set is always a subset of `request.content`'s keys.
    /// Failures are never retried here.
    pub async fn translate_batch(
        &self,
        request: &TranslationRequest,
    ) -> Result<MissingKeysMap, GatewayError> {
        request.validate()?;

        if request.content.is_empty() {
            return Ok(MissingKeysMap::new());
        }

        let requested = request.content.len();
        if requested > self.max_keys {
            tracing::warn!(requested, limit = self.max_keys, "Rejected oversized translation batch");
            return Err(GatewayError::PayloadTooLarge { actual: requested, limit: self.max_keys });
        }

        let prompt = build_prompt(request)?;
        tracing::debug!(
            provider = self.provider.name(),
            requested,
            target_lang = %request.target_lang,
            "Dispatching translation batch"
        );

        let raw = self.provider.complete(&prompt).await.map_err(|err| {
            tracing::error!(provider = self.provider.name(), error = %err, "Provider call failed");
            GatewayError::from(err)
        })?;

        let Some(Value::Object(response)) = parse_lenient(&raw) else {
            tracing::error!(provider = self.provider.name(), raw = %raw, "Provider returned malformed JSON");
            return Err(GatewayError::MalformedResponse { raw });
        };

        let accepted = whitelist(&request.content, &response);
        if accepted.len() < requested {
            tracing::warn!(
                requested,
                accepted = accepted.len(),
                "Provider response did not cover every requested key"
            );
        }

        Ok(accepted)
    }
}

/// Keeps only requested keys whose response value is a string.
///
/// Extra, renamed or restructured keys are dropped; omitted keys stay absent.
#[must_use]
pub fn whitelist(requested: &MissingKeysMap, response: &Map<String, Value>) -> MissingKeysMap {
    requested
        .keys()
        .filter_map(|key| match response.get(key) {
            Some(Value::String(text)) => Some((key.clone(), text.clone())),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::provider::{
        ErrorKind,
        ProviderError,
    };
    use crate::test_utils::{
        ScriptedProvider,
        missing,
    };

    fn gateway(provider: &Arc<ScriptedProvider>) -> ProviderGateway {
        let provider: Arc<dyn Provider> = provider.clone();
        ProviderGateway::new(provider)
    }

    fn request(content: MissingKeysMap) -> TranslationRequest {
        TranslationRequest::new("en", "ja", content)
    }

    #[tokio::test]
    async fn test_oversized_batches_never_reach_the_provider() {
        let provider = Arc::new(ScriptedProvider::with_responses(["{}"]));
        let content: MissingKeysMap =
            (0..51).map(|i| (format!("key{i}"), format!("value {i}"))).collect();

        let result = gateway(&provider).translate_batch(&request(content)).await;

        assert_that!(result, err(eq(&GatewayError::PayloadTooLarge { actual: 51, limit: 50 })));
        assert_that!(provider.calls(), eq(0));
    }

    #[tokio::test]
    async fn test_batches_at_the_ceiling_are_dispatched() {
        let provider = Arc::new(ScriptedProvider::echo());
        let content: MissingKeysMap =
            (0..50).map(|i| (format!("key{i}"), format!("value {i}"))).collect();

        let result = gateway(&provider).translate_batch(&request(content)).await.unwrap();

        assert_that!(result.len(), eq(50));
        assert_that!(provider.calls(), eq(1));
    }

    #[tokio::test]
    async fn test_custom_ceiling_is_enforced() {
        let provider = Arc::new(ScriptedProvider::echo());
        let gateway = gateway(&provider).with_max_keys(2);

        let result = gateway.translate_batch(&request(missing(&[("a", "A"), ("b", "B"), ("c", "C")]))).await;

        assert_that!(result.map_err(|e| e.kind()), err(eq(&ErrorKind::PayloadTooLarge)));
        assert_that!(provider.calls(), eq(0));
    }

    #[tokio::test]
    async fn test_hallucinated_keys_are_discarded() {
        let provider = Arc::new(ScriptedProvider::with_responses([r#"{"a":"Y","b":"Z"}"#]));

        let result = gateway(&provider).translate_batch(&request(missing(&[("a", "X")]))).await;

        assert_eq!(result.unwrap(), missing(&[("a", "Y")]));
    }

    #[tokio::test]
    async fn test_non_string_and_omitted_values_are_dropped() {
        let provider = Arc::new(ScriptedProvider::with_responses([
            r#"{"a": {"nested": "no"}, "b": 3, "c": "C!"}"#,
        ]));
        let content = missing(&[("a", "A"), ("b", "B"), ("c", "C"), ("d", "D")]);

        let result = gateway(&provider).translate_batch(&request(content)).await;

        assert_eq!(result.unwrap(), missing(&[("c", "C!")]));
    }

    #[tokio::test]
    async fn test_fenced_output_with_trailing_comma_is_repaired() {
        let provider = Arc::new(ScriptedProvider::with_responses([
            "```json\n{\"app.title\": \"タイトル\", \"app.desc\": \"説明\",}\n```",
        ]));
        let content = missing(&[("app.title", "Title"), ("app.desc", "Description")]);

        let result = gateway(&provider).translate_batch(&request(content)).await;

        assert_eq!(result.unwrap(), missing(&[("app.desc", "説明"), ("app.title", "タイトル")]));
    }

    #[tokio::test]
    async fn test_dotted_key_with_single_backslash_is_accepted() {
        let provider = Arc::new(ScriptedProvider::with_responses([r#"{"meta.app\.name": "アプリ"}"#]));
        let content = missing(&[("meta.app\\.name", "App")]);

        let result = gateway(&provider).translate_batch(&request(content)).await;

        assert_eq!(result.unwrap(), missing(&[("meta.app\\.name", "アプリ")]));
    }

    #[tokio::test]
    async fn test_unrepairable_output_keeps_the_raw_text() {
        let raw = "I'm sorry, I can't translate that.";
        let provider = Arc::new(ScriptedProvider::with_responses([raw]));

        let result = gateway(&provider).translate_batch(&request(missing(&[("a", "A")]))).await;

        assert_that!(result, err(eq(&GatewayError::MalformedResponse { raw: raw.to_string() })));
    }

    #[tokio::test]
    async fn test_non_object_json_is_malformed() {
        let provider = Arc::new(ScriptedProvider::with_responses([r#"["Y"]"#]));

        let result = gateway(&provider).translate_batch(&request(missing(&[("a", "A")]))).await;

        assert_that!(result.map_err(|e| e.kind()), err(eq(&ErrorKind::MalformedResponse)));
    }

    #[tokio::test]
    async fn test_transport_errors_surface_without_retry() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::Transport("timed out".into())));

        let result = gateway(&provider).translate_batch(&request(missing(&[("a", "A")]))).await;

        assert_that!(result, err(eq(&GatewayError::ProviderUnavailable("timed out".into()))));
        assert_that!(provider.calls(), eq(1));
    }

    #[tokio::test]
    async fn test_empty_content_short_circuits() {
        let provider = Arc::new(ScriptedProvider::echo());

        let result = gateway(&provider).translate_batch(&request(MissingKeysMap::new())).await;

        assert_that!(result, ok(is_empty()));
        assert_that!(provider.calls(), eq(0));
    }

    #[rstest]
    #[case("", "ja")]
    #[case("e", "ja")]
    #[case("en", " j ")]
    fn test_short_language_codes_are_invalid(#[case] source: &str, #[case] target: &str) {
        let provider = Arc::new(ScriptedProvider::echo());
        let request = TranslationRequest::new(source, target, missing(&[("a", "A")]));

        let result = tokio_test::block_on(gateway(&provider).translate_batch(&request));

        assert_that!(result.map_err(|e| e.kind()), err(eq(&ErrorKind::InvalidRequest)));
        assert_that!(provider.calls(), eq(0));
    }

    #[rstest]
    fn test_request_body_is_parsed() {
        let body = json!({
            "sourceLang": "en",
            "targetLang": "ja",
            "content": { "app.title": "Title" },
            "context": "Settings page"
        });

        let request = TranslationRequest::from_json(&body).unwrap();

        assert_eq!(request.content, missing(&[("app.title", "Title")]));
        assert_eq!(request.context.as_deref(), Some("Settings page"));
    }

    #[rstest]
    #[case(json!([]))]
    #[case(json!({ "targetLang": "ja", "content": {} }))]
    #[case(json!({ "sourceLang": "en", "targetLang": "ja", "content": "text" }))]
    #[case(json!({ "sourceLang": "en", "targetLang": "ja", "content": { "a": { "b": "c" } } }))]
    #[case(json!({ "sourceLang": "en", "targetLang": "ja", "content": { "a": 1 } }))]
    #[case(json!({ "sourceLang": "en", "targetLang": "ja", "content": {}, "context": 5 }))]
    #[case(json!({ "sourceLang": 1, "targetLang": "ja", "content": {} }))]
    fn test_malformed_request_bodies_are_rejected(#[case] body: Value) {
        let result = TranslationRequest::from_json(&body);

        assert_that!(result.map_err(|e| e.kind()), err(eq(&ErrorKind::InvalidRequest)));
    }

    #[googletest::test]
    fn test_whitelist_is_a_subset_of_the_request() {
        let requested = missing(&[("a", "A"), ("b", "B")]);
        let response = json!({ "a": "1", "b": "2", "c": "3", "A": "4" });

        let accepted = whitelist(&requested, response.as_object().unwrap());

        expect_that!(accepted.keys().all(|k| requested.contains_key(k)), eq(true));
        assert_eq!(accepted, missing(&[("a", "1"), ("b", "2")]));
    }
}
