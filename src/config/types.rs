use std::time::Duration;

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::provider::DEFAULT_MAX_KEYS_PER_REQUEST;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "excludePatterns[0]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Translation backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    #[default]
    Groq,
    Gemini,
    Mock,
}

impl ProviderKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Groq => "groq",
            Self::Gemini => "gemini",
            Self::Mock => "mock",
        }
    }

    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::Mock => "",
        }
    }

    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Groq => "llama-3.3-70b-versatile",
            Self::Gemini => "gemini-2.5-flash",
            Self::Mock => "mock",
        }
    }

    #[must_use]
    pub const fn default_api_key_env(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
            Self::Mock => "",
        }
    }

    #[must_use]
    pub const fn default_temperature(self) -> f32 {
        match self {
            Self::OpenAi => 0.3,
            Self::Groq | Self::Gemini | Self::Mock => 0.1,
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gpt" => Ok(Self::OpenAi),
            "groq" => Ok(Self::Groq),
            "gemini" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown provider '{other}' (expected openai, groq, gemini or mock)")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    /// Overrides the per-kind default model.
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchConfig {
    /// Circuit-breaker ceiling per provider call.
    pub max_keys_per_request: usize,
    /// Send oversized diffs as sequential chunks instead of failing.
    pub split_oversized: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_keys_per_request: DEFAULT_MAX_KEYS_PER_REQUEST, split_oversized: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslationFilesConfig {
    pub file_pattern: String,
}

impl Default for TranslationFilesConfig {
    fn default() -> Self {
        Self { file_pattern: "**/{locales,messages}/**/*.json".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    pub provider: ProviderSettings,
    pub batch: BatchConfig,

    /// Prompt context, e.g. "Checkout page".
    pub context: Option<String>,

    /// Dictionary every other language is synced from, relative to the workspace root.
    pub source_file: String,
    /// Detected from `source_file` when unset.
    pub source_language: Option<String>,

    pub translation_files: TranslationFilesConfig,
    pub exclude_patterns: Vec<String>,

    /// Languages to sync.
    ///
    /// - `None`: every detected language (default)
    /// - `Some([...])`: only the listed languages
    pub target_languages: Option<Vec<String>>,

    /// Parallel syncs in workspace mode.
    /// Default: number of CPU cores.
    pub concurrency: Option<usize>,

    /// Deadline for one sync, provider round trip included.
    pub deadline_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            provider: ProviderSettings::default(),
            batch: BatchConfig::default(),
            context: None,
            source_file: "locales/en.json".to_string(),
            source_language: None,
            translation_files: TranslationFilesConfig::default(),
            exclude_patterns: vec!["node_modules/**".to_string()],
            target_languages: None,
            concurrency: None,
            deadline_secs: 60,
        }
    }
}

impl SyncSettings {
    /// Effective parallelism (at least 1).
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or_else(num_cpus::get).max(1)
    }

    #[must_use]
    pub const fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    /// # Errors
    /// - Required field is empty
    /// - Invalid glob pattern
    /// - Zero limits
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.batch.max_keys_per_request == 0 {
            errors.push(ValidationError::new(
                "batch.maxKeysPerRequest",
                "Must be greater than 0. Example: 50",
            ));
        }

        if let Some(temperature) = self.provider.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            errors.push(ValidationError::new(
                "provider.temperature",
                format!("Must be between 0 and 2, got {temperature}"),
            ));
        }

        if self.provider.api_key_env.as_ref().is_some_and(|var| var.trim().is_empty()) {
            errors.push(ValidationError::new(
                "provider.apiKeyEnv",
                "The variable name cannot be empty. Remove this field to use the default",
            ));
        }

        if self.source_file.trim().is_empty() {
            errors.push(ValidationError::new(
                "sourceFile",
                "The path cannot be empty. Example: \"locales/en.json\"",
            ));
        }

        if let Some(language) = &self.source_language
            && language.trim().chars().count() < 2
        {
            errors.push(ValidationError::new(
                "sourceLanguage",
                "Language codes must be at least 2 characters. Example: \"en\"",
            ));
        }

        if self.translation_files.file_pattern.is_empty() {
            errors.push(ValidationError::new(
                "translationFiles.filePattern",
                "The pattern cannot be empty. Example: \"**/{locales,messages}/**/*.json\"",
            ));
        } else if let Err(e) = globset::Glob::new(&self.translation_files.file_pattern) {
            errors.push(ValidationError::new(
                "translationFiles.filePattern",
                format!("Invalid glob pattern '{}': {e}", self.translation_files.file_pattern),
            ));
        }

        for (index, pattern) in self.exclude_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("excludePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        if let Some(languages) = &self.target_languages {
            for (index, language) in languages.iter().enumerate() {
                if language.trim().chars().count() < 2 {
                    errors.push(ValidationError::new(
                        format!("targetLanguages[{index}]"),
                        format!("Invalid language code '{language}'. Example: \"ja\""),
                    ));
                }
            }
        }

        if self.concurrency == Some(0) {
            errors.push(ValidationError::new(
                "concurrency",
                "Must be greater than 0. Remove this field to use the number of CPU cores",
            ));
        }

        if self.deadline_secs == 0 {
            errors.push(ValidationError::new("deadlineSecs", "Must be greater than 0. Example: 60"));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
