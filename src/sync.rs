//! Diff, translate and merge pipeline for one source/target pair.

use serde::Serialize;

use crate::diff::find_missing;
use crate::merge::{
    MergeError,
    MergeOptions,
    merge_translations,
};
use crate::provider::{
    GatewayError,
    ProviderGateway,
    TranslationRequest,
};
use crate::types::{
    Dictionary,
    MissingKeysMap,
};

/// Inputs of one sync. Nothing here is mutated.
#[derive(Debug, Clone, Copy)]
pub struct SyncRequest<'a> {
    pub source: &'a Dictionary,
    pub target: &'a Dictionary,
    pub source_lang: &'a str,
    pub target_lang: &'a str,
    pub context: Option<&'a str>,
}

/// Outcome of a successful sync.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// Target with every accepted translation filled in.
    pub merged: Dictionary,
    /// Missing keys sent for translation.
    pub requested_count: usize,
    /// Keys that survived the response whitelist.
    pub received_count: usize,
    /// Keys actually written into `merged`.
    pub merged_count: usize,
    pub errors: Vec<MergeError>,
}

impl SyncReport {
    fn unchanged(target: &Dictionary) -> Self {
        Self {
            merged: target.clone(),
            requested_count: 0,
            received_count: 0,
            merged_count: 0,
            errors: Vec::new(),
        }
    }

    /// Fewer keys were merged than requested.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.merged_count < self.requested_count
    }

    /// Nothing was missing.
    #[must_use]
    pub const fn is_in_sync(&self) -> bool {
        self.requested_count == 0
    }
}

/// Runs [`SyncRequest`]s through a [`ProviderGateway`].
#[derive(Debug, Clone)]
pub struct SyncOrchestrator {
    gateway: ProviderGateway,
    split_oversized: bool,
}

impl SyncOrchestrator {
    #[must_use]
    pub const fn new(gateway: ProviderGateway) -> Self {
        Self { gateway, split_oversized: false }
    }

    /// Send diffs above the gateway ceiling as sequential chunks.
    #[must_use]
    pub const fn with_split_oversized(mut self, split_oversized: bool) -> Self {
        self.split_oversized = split_oversized;
        self
    }

    #[must_use]
    pub const fn gateway(&self) -> &ProviderGateway {
        &self.gateway
    }

    /// Fills the keys `request.target` is missing.
    ///
    /// Existing target values are never overwritten. On error the caller
    /// keeps its target as it was; nothing is merged.
    pub async fn sync(&self, request: SyncRequest<'_>) -> Result<SyncReport, GatewayError> {
        let missing = find_missing(request.source, request.target);
        if missing.is_empty() {
            tracing::info!(target_lang = request.target_lang, "Nothing to translate");
            return Ok(SyncReport::unchanged(request.target));
        }

        let requested_count = missing.len();
        tracing::info!(
            target_lang = request.target_lang,
            provider = self.gateway.provider_name(),
            requested = requested_count,
            "Starting sync"
        );

        let translated = if self.split_oversized && requested_count > self.gateway.max_keys() {
            self.translate_in_chunks(&request, missing).await?
        } else {
            self.gateway.translate_batch(&translation_request(&request, missing)).await?
        };

        let outcome = merge_translations(request.target, &translated, MergeOptions::default());
        let received_count = translated.len();
        let merged_count = outcome.written(received_count);

        tracing::info!(
            target_lang = request.target_lang,
            requested = requested_count,
            received = received_count,
            merged = merged_count,
            rejected = outcome.errors.len(),
            "Sync complete"
        );

        Ok(SyncReport {
            merged: outcome.merged,
            requested_count,
            received_count,
            merged_count,
            errors: outcome.errors,
        })
    }

    /// Any failing chunk fails the whole sync.
    async fn translate_in_chunks(
        &self,
        request: &SyncRequest<'_>,
        missing: MissingKeysMap,
    ) -> Result<MissingKeysMap, GatewayError> {
        let entries: Vec<(String, String)> = missing.into_iter().collect();
        let chunk_size = self.gateway.max_keys();
        let chunk_total = entries.len().div_ceil(chunk_size);
        let mut translated = MissingKeysMap::new();

        for (index, chunk) in entries.chunks(chunk_size).enumerate() {
            tracing::debug!(chunk = index + 1, of = chunk_total, keys = chunk.len(), "Translating chunk");
            let content: MissingKeysMap = chunk.iter().cloned().collect();
            let accepted = self.gateway.translate_batch(&translation_request(request, content)).await?;
            translated.extend(accepted);
        }

        Ok(translated)
    }
}

fn translation_request(request: &SyncRequest<'_>, content: MissingKeysMap) -> TranslationRequest {
    TranslationRequest::new(request.source_lang, request.target_lang, content)
        .with_context(request.context)
}

/// Caller-facing summary of a sync, serialized in camelCase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    /// `None` when the sync failed.
    pub merged_json: Option<Dictionary>,
    pub translated_count: usize,
    pub success: bool,
    pub message: String,
}

impl From<Result<SyncReport, GatewayError>> for SyncResult {
    fn from(result: Result<SyncReport, GatewayError>) -> Self {
        match result {
            Ok(report) => {
                let message = if report.is_in_sync() {
                    "No missing keys found. Files are in sync.".to_string()
                } else if report.errors.is_empty() {
                    format!("Successfully translated {} keys.", report.requested_count)
                } else {
                    format!(
                        "Translated {} keys with {} merge warnings.",
                        report.requested_count,
                        report.errors.len()
                    )
                };
                Self {
                    merged_json: Some(report.merged),
                    translated_count: report.requested_count,
                    success: true,
                    message,
                }
            }
            Err(error) => Self {
                merged_json: None,
                translated_count: 0,
                success: false,
                message: error.user_message(),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use googletest::prelude::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::merge::MergeErrorReason;
    use crate::provider::{
        ErrorKind,
        Provider,
        ProviderError,
    };
    use crate::test_utils::{
        ScriptedProvider,
        dict,
    };

    fn orchestrator(provider: &Arc<ScriptedProvider>) -> SyncOrchestrator {
        let provider: Arc<dyn Provider> = provider.clone();
        SyncOrchestrator::new(ProviderGateway::new(provider))
    }

    fn request<'a>(source: &'a Dictionary, target: &'a Dictionary) -> SyncRequest<'a> {
        SyncRequest { source, target, source_lang: "en", target_lang: "zh", context: None }
    }

    #[tokio::test]
    async fn test_in_sync_targets_make_no_provider_call() {
        let provider = Arc::new(ScriptedProvider::echo());
        let source = dict(json!({ "a": "A" }));
        let target = dict(json!({ "a": "甲" }));

        let report = orchestrator(&provider).sync(request(&source, &target)).await.unwrap();

        assert_eq!(report.merged, target);
        assert_that!(report.requested_count, eq(0));
        assert_that!(report.is_partial(), eq(false));
        assert_that!(provider.calls(), eq(0));
    }

    #[tokio::test]
    async fn test_fills_missing_keys_and_keeps_existing_ones() {
        let provider = Arc::new(ScriptedProvider::with_responses([
            r#"{"app.desc": "描述", "app.menu.about": "关于", "errors.404": "未找到"}"#,
        ]));
        let source = dict(json!({
            "app": { "title": "Hello", "desc": "Desc", "menu": { "home": "Home", "about": "About" } },
            "errors": { "404": "Not found" }
        }));
        let target = dict(json!({ "app": { "title": "你好", "menu": { "home": "首页" } } }));

        let report = orchestrator(&provider).sync(request(&source, &target)).await.unwrap();

        assert_eq!(
            serde_json::Value::Object(report.merged),
            json!({
                "app": { "title": "你好", "menu": { "home": "首页", "about": "关于" }, "desc": "描述" },
                "errors": { "404": "未找到" }
            })
        );
        assert_that!(report.requested_count, eq(3));
        assert_that!(report.merged_count, eq(3));
    }

    #[tokio::test]
    async fn test_null_leaves_converge_after_one_sync() {
        let provider = Arc::new(ScriptedProvider::echo());
        let source = dict(json!({ "title": "Title" }));
        let target = dict(json!({ "title": null }));
        let orchestrator = orchestrator(&provider);

        let first = orchestrator.sync(request(&source, &target)).await.unwrap();
        let second = orchestrator.sync(request(&source, &first.merged)).await.unwrap();

        assert_that!(first.merged_count, eq(1));
        assert_that!(first.errors, is_empty());
        assert_eq!(second.merged, first.merged);
        assert_that!(second.requested_count, eq(0));
        assert_that!(provider.calls(), eq(1));
    }

    #[tokio::test]
    async fn test_omitted_keys_make_the_report_partial() {
        let provider = Arc::new(ScriptedProvider::with_responses([r#"{"a": "甲", "zzz": "extra"}"#]));
        let source = dict(json!({ "a": "A", "b": "B" }));
        let target = Dictionary::new();

        let report = orchestrator(&provider).sync(request(&source, &target)).await.unwrap();

        assert_that!(report.received_count, eq(1));
        assert_that!(report.merged_count, eq(1));
        assert_that!(report.is_partial(), eq(true));
        assert_that!(report.merged.contains_key("zzz"), eq(false));
    }

    #[tokio::test]
    async fn test_merge_rejections_are_reported() {
        let provider = Arc::new(ScriptedProvider::with_responses([r#"{"list.0": "x", "ok": "好"}"#]));
        let source = dict(json!({ "list": { "0": "zero" }, "ok": "OK" }));
        let target = dict(json!({ "list": ["keep"] }));

        let report = orchestrator(&provider).sync(request(&source, &target)).await.unwrap();

        assert_that!(report.merged_count, eq(1));
        assert_eq!(report.errors.iter().map(|e| e.reason).collect::<Vec<_>>(), vec![MergeErrorReason::ArrayNotSupported]);
        assert_eq!(report.merged["list"], json!(["keep"]));
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_nothing_merged() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::Status {
            status: 500,
            message: "boom".into(),
        }));
        let source = dict(json!({ "a": "A" }));
        let target = Dictionary::new();

        let result = orchestrator(&provider).sync(request(&source, &target)).await;

        assert_that!(result.map_err(|e| e.kind()), err(eq(&ErrorKind::ProviderError)));
    }

    #[tokio::test]
    async fn test_oversized_diffs_fail_without_splitting() {
        let provider = Arc::new(ScriptedProvider::echo());
        let source: Dictionary = (0..51).map(|i| (format!("k{i}"), json!(format!("v{i}")))).collect();

        let result = orchestrator(&provider).sync(request(&source, &Dictionary::new())).await;

        assert_that!(result.map_err(|e| e.kind()), err(eq(&ErrorKind::PayloadTooLarge)));
        assert_that!(provider.calls(), eq(0));
    }

    #[tokio::test]
    async fn test_oversized_diffs_are_chunked_when_enabled() {
        let provider = Arc::new(ScriptedProvider::echo());
        let source: Dictionary = (0..120).map(|i| (format!("k{i:03}"), json!(format!("v{i}")))).collect();
        let target = Dictionary::new();

        let report = orchestrator(&provider)
            .with_split_oversized(true)
            .sync(request(&source, &target))
            .await
            .unwrap();

        assert_that!(provider.calls(), eq(3));
        assert_that!(report.merged_count, eq(120));
        assert_that!(report.merged.len(), eq(120));
    }

    #[tokio::test]
    async fn test_one_failing_chunk_fails_the_sync() {
        let provider = Arc::new(ScriptedProvider::echo_then_fail(1, ProviderError::Transport("reset".into())));
        let source: Dictionary = (0..60).map(|i| (format!("k{i:02}"), json!(format!("v{i}")))).collect();

        let result = orchestrator(&provider)
            .with_split_oversized(true)
            .sync(request(&source, &Dictionary::new()))
            .await;

        assert_that!(result.map_err(|e| e.kind()), err(eq(&ErrorKind::ProviderUnavailable)));
        assert_that!(provider.calls(), eq(2));
    }

    #[rstest]
    fn test_result_messages() {
        let report = |requested: usize, errors: Vec<MergeError>| SyncReport {
            merged: Dictionary::new(),
            requested_count: requested,
            received_count: requested,
            merged_count: requested - errors.len(),
            errors,
        };
        let warning = MergeError {
            path: "a".into(),
            reason: MergeErrorReason::OverwriteBlocked,
            value: "x".into(),
        };

        let in_sync = SyncResult::from(Ok(report(0, vec![])));
        let clean = SyncResult::from(Ok(report(4, vec![])));
        let warned = SyncResult::from(Ok(report(4, vec![warning])));

        assert_that!(in_sync.message, eq("No missing keys found. Files are in sync."));
        assert_that!(clean.message, eq("Successfully translated 4 keys."));
        assert_that!(warned.message, eq("Translated 4 keys with 1 merge warnings."));
        assert_that!(warned.translated_count, eq(4));
    }

    #[rstest]
    fn test_failed_result_hides_provider_details() {
        let result = SyncResult::from(Err(GatewayError::ProviderError("upstream 500: secret".into())));

        assert_that!(result.success, eq(false));
        assert_that!(result.merged_json, none());
        assert_that!(result.message, not(contains_substring("secret")));
    }

    #[rstest]
    fn test_result_serializes_in_camel_case() {
        let result = SyncResult::from(Ok(SyncReport::unchanged(&dict(json!({ "a": "A" })))));

        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(
            value,
            json!({
                "mergedJson": { "a": "A" },
                "translatedCount": 0,
                "success": true,
                "message": "No missing keys found. Files are in sync."
            })
        );
    }

    #[rstest]
    fn test_sync_is_usable_from_blocking_code() {
        let provider = Arc::new(ScriptedProvider::echo());
        let source = dict(json!({ "title": "Title" }));
        let target = Dictionary::new();

        let report = tokio_test::block_on(orchestrator(&provider).sync(request(&source, &target))).unwrap();

        assert_eq!(report.merged["title"], json!("Title"));
    }
}
