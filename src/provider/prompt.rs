use super::error::GatewayError;
use super::gateway::TranslationRequest;
use crate::input::language::display_name;

/// Context used when the request carries none.
pub const DEFAULT_CONTEXT: &str = "UI Strings";

/// Provider-neutral prompt: a system instruction plus a JSON user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    /// The requested `{ path: text }` map, serialized as JSON.
    pub user: String,
    /// Target code as requested, for providers that need it outside the text.
    pub target_language: String,
}

/// Builds the prompt for one batch.
pub fn build_prompt(request: &TranslationRequest) -> Result<Prompt, GatewayError> {
    let source = display_name(&request.source_lang);
    let target = display_name(&request.target_lang);
    let context = request
        .context
        .as_deref()
        .map(str::trim)
        .filter(|context| !context.is_empty())
        .unwrap_or(DEFAULT_CONTEXT);

    let system = format!(
        "You are a professional i18n localization engine.\n\
         Task: translate the JSON values from \"{source}\" to \"{target}\".\n\
         \n\
         Rules:\n\
         1. Translate every value. Do not leave strings empty and do not copy the source unless it is a proper noun.\n\
         2. Keep every key exactly as given. Keys may contain dots (e.g. \"meta.app_name\"); never expand them into nested objects.\n\
         3. Keep placeholders such as {{name}}, {{{{count}}}} and %s, and markup such as <b> or <br/>, exactly as they are.\n\
         4. Output one strict JSON object and nothing else: no Markdown fences, no explanations.\n\
         \n\
         Example:\n\
         Input: {{\"nav.home\": \"Home\", \"btn.save\": \"Save\"}}\n\
         Output: {{\"nav.home\": \"首页\", \"btn.save\": \"保存\"}}\n\
         \n\
         Context: {context}."
    );

    let user = serde_json::to_string(&request.content)
        .map_err(|err| GatewayError::InvalidRequest(format!("content is not serializable: {err}")))?;

    Ok(Prompt { system, user, target_language: request.target_lang.trim().to_string() })
}
