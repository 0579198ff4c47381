//! Workspace mode: sync every translation file against the source dictionary.

use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;

use futures::stream::{
    self,
    StreamExt,
};
use globset::{
    Glob,
    GlobSet,
    GlobSetBuilder,
};
use ignore::WalkBuilder;
use serde::Serialize;
use thiserror::Error;

use crate::config::SyncSettings;
use crate::input::dictionary::{
    DictionaryError,
    load_dictionary,
    save_dictionary,
};
use crate::input::language::{
    detect_language_from_path,
    same_language,
};
use crate::provider::{
    Provider,
    ProviderGateway,
};
use crate::sync::{
    SyncOrchestrator,
    SyncRequest,
};
use crate::types::Dictionary;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("Failed to load source dictionary: {0}")]
    Source(#[from] DictionaryError),

    #[error(
        "Cannot detect the language of '{}'. Set \"sourceLanguage\" in the config file",
        .0.display()
    )]
    UnknownSourceLanguage(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FileSyncStatus {
    /// Missing keys were filled and the file was rewritten.
    Updated,
    /// Dry run: the file would have been rewritten.
    WouldUpdate,
    Unchanged,
    Failed,
}

/// What happened to one target file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSyncSummary {
    pub path: PathBuf,
    pub language: String,
    pub status: FileSyncStatus,
    pub requested_count: usize,
    pub merged_count: usize,
    /// Merge rejections (existing values, array paths).
    pub warnings: usize,
    pub error: Option<String>,
}

impl FileSyncSummary {
    fn failed(path: PathBuf, language: String, error: String) -> Self {
        Self {
            path,
            language,
            status: FileSyncStatus::Failed,
            requested_count: 0,
            merged_count: 0,
            warnings: 0,
            error: Some(error),
        }
    }
}

#[derive(Debug)]
struct TargetFile {
    path: PathBuf,
    language: String,
}

/// Syncs all translation files under a workspace root.
#[derive(Debug, Clone)]
pub struct WorkspaceSyncer {
    root: PathBuf,
    settings: SyncSettings,
    orchestrator: SyncOrchestrator,
    dry_run: bool,
}

impl WorkspaceSyncer {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, settings: SyncSettings, provider: Arc<dyn Provider>) -> Self {
        let gateway = ProviderGateway::new(provider).with_max_keys(settings.batch.max_keys_per_request);
        let orchestrator =
            SyncOrchestrator::new(gateway).with_split_oversized(settings.batch.split_oversized);
        Self { root: root.into(), settings, orchestrator, dry_run: false }
    }

    /// Report what would change without writing any file.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn source_path(&self) -> PathBuf {
        self.root.join(&self.settings.source_file)
    }

    /// Syncs every target file, up to `concurrency` at a time.
    ///
    /// Per-file failures are reported in the summaries; only problems with
    /// the source dictionary or the patterns abort the run.
    ///
    /// # Errors
    /// See [`WorkspaceError`].
    pub async fn run(&self) -> Result<Vec<FileSyncSummary>, WorkspaceError> {
        let source_path = self.source_path();
        let source = load_dictionary(&source_path)?;
        let source_lang = match &self.settings.source_language {
            Some(language) => language.clone(),
            None => detect_language_from_path(&source_path)
                .ok_or_else(|| WorkspaceError::UnknownSourceLanguage(source_path.clone()))?,
        };

        let targets = self.collect_targets(&source_path, &source_lang)?;
        tracing::info!(
            root = %self.root.display(),
            source = %source_path.display(),
            source_lang = %source_lang,
            targets = targets.len(),
            dry_run = self.dry_run,
            "Syncing workspace"
        );

        let mut summaries: Vec<FileSyncSummary> = stream::iter(targets)
            .map(|target| self.sync_file(&source, &source_lang, target))
            .buffer_unordered(self.settings.concurrency())
            .collect()
            .await;
        summaries.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(summaries)
    }

    fn collect_targets(
        &self,
        source_path: &Path,
        source_lang: &str,
    ) -> Result<Vec<TargetFile>, WorkspaceError> {
        let files = find_translation_files(
            &self.root,
            &self.settings.translation_files.file_pattern,
            &self.settings.exclude_patterns,
        )?;

        let mut targets = Vec::new();
        for path in files {
            if path == source_path || !is_counterpart(source_path, &path) {
                continue;
            }
            let Some(language) = detect_language_from_path(&path) else {
                tracing::warn!(path = %path.display(), "Skipping file with unknown language");
                continue;
            };
            if same_language(&language, source_lang) {
                continue;
            }
            if let Some(allowed) = &self.settings.target_languages
                && !allowed.iter().any(|lang| same_language(lang, &language))
            {
                tracing::debug!(path = %path.display(), language = %language, "Language not in targetLanguages");
                continue;
            }
            targets.push(TargetFile { path, language });
        }

        Ok(targets)
    }

    async fn sync_file(&self, source: &Dictionary, source_lang: &str, target: TargetFile) -> FileSyncSummary {
        let TargetFile { path, language } = target;

        let dictionary = match load_dictionary(&path) {
            Ok(dictionary) => dictionary,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Skipping unreadable file");
                return FileSyncSummary::failed(path, language, err.to_string());
            }
        };

        let request = SyncRequest {
            source,
            target: &dictionary,
            source_lang,
            target_lang: &language,
            context: self.settings.context.as_deref(),
        };
        let report =
            match tokio::time::timeout(self.settings.deadline(), self.orchestrator.sync(request)).await {
                Ok(Ok(report)) => report,
                Ok(Err(err)) => {
                    tracing::error!(
                        path = %path.display(),
                        retryable = err.is_retryable(),
                        error = %err,
                        "Sync failed"
                    );
                    return FileSyncSummary::failed(path, language, err.to_string());
                }
                Err(_) => {
                    let message = format!("timed out after {}s", self.settings.deadline_secs);
                    tracing::error!(path = %path.display(), "Sync {message}");
                    return FileSyncSummary::failed(path, language, message);
                }
            };

        let status = if report.merged == dictionary {
            FileSyncStatus::Unchanged
        } else if self.dry_run {
            FileSyncStatus::WouldUpdate
        } else if let Err(err) = save_dictionary(&path, &report.merged) {
            tracing::error!(path = %path.display(), error = %err, "Failed to write file");
            return FileSyncSummary::failed(path, language, err.to_string());
        } else {
            FileSyncStatus::Updated
        };

        FileSyncSummary {
            path,
            language,
            status,
            requested_count: report.requested_count,
            merged_count: report.merged_count,
            warnings: report.errors.len(),
            error: None,
        }
    }
}

/// Whether `target` plays the same role as `source` in its language.
///
/// Flat layouts (`locales/en.json`) pair by language-named files; namespaced
/// layouts (`locales/en/common.json`) pair by file name.
fn is_counterpart(source: &Path, target: &Path) -> bool {
    let flat = |path: &Path| {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| detect_language_from_path(Path::new(stem)).is_some())
    };

    if flat(source) { flat(target) } else { source.file_name() == target.file_name() }
}

fn build_glob_set<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<GlobSet, WorkspaceError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| WorkspaceError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| WorkspaceError::Pattern { pattern: String::new(), message: e.to_string() })
}

/// Finds translation files under `root`, honouring `.gitignore`.
///
/// # Errors
/// Invalid glob pattern.
pub fn find_translation_files(
    root: &Path,
    file_pattern: &str,
    exclude_patterns: &[String],
) -> Result<Vec<PathBuf>, WorkspaceError> {
    let include_set = build_glob_set([file_pattern])?;
    let exclude_set = build_glob_set(exclude_patterns.iter().map(String::as_str))?;
    let mut found_files = Vec::new();

    for result in WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .follow_links(false)
        .build()
    {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(?err, "Failed to read directory entry");
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let Ok(relative_path) = path.strip_prefix(root) else {
            continue;
        };
        if !include_set.is_match(relative_path) || exclude_set.is_match(relative_path) {
            continue;
        }

        found_files.push(path.to_path_buf());
    }

    found_files.sort();
    Ok(found_files)
}
