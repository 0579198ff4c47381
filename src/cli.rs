//! Command-line front end.

use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;

use clap::{
    Parser,
    Subcommand,
};
use serde_json::json;
use thiserror::Error;

use crate::config::{
    ConfigError,
    ConfigManager,
    ProviderKind,
    ProviderSettings,
    SyncSettings,
};
use crate::diff::{
    DiffOptions,
    count_translatable_leaves,
    diff_with,
    find_untranslatable,
    flatten,
};
use crate::input::dictionary::{
    DictionaryError,
    load_dictionary,
    save_dictionary,
    to_pretty_json,
};
use crate::input::language::detect_language_from_path;
use crate::provider::{
    self,
    GatewayError,
    Provider,
    ProviderError,
    ProviderGateway,
    TranslationRequest,
};
use crate::sync::{
    SyncOrchestrator,
    SyncRequest,
    SyncResult,
};
use crate::workspace::{
    FileSyncStatus,
    WorkspaceError,
    WorkspaceSyncer,
};

#[derive(Parser, Debug)]
#[command(name = "json-i18n-sync", version, about = "Translate the keys missing from JSON locale files")]
pub struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Directory holding the config file
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the keys of SOURCE that TARGET is missing
    Diff {
        source: PathBuf,
        target: PathBuf,
        /// Also list target keys the source no longer has
        #[arg(long)]
        obsolete: bool,
        #[arg(long)]
        json: bool,
    },

    /// Translate the missing keys of one target file
    Sync {
        source: PathBuf,
        target: PathBuf,
        /// Detected from the source path when omitted
        #[arg(long)]
        source_lang: Option<String>,
        /// Detected from the target path when omitted
        #[arg(long)]
        target_lang: Option<String>,
        #[arg(long)]
        context: Option<String>,
        #[arg(long)]
        provider: Option<ProviderKind>,
        #[arg(long)]
        model: Option<String>,
        /// Write here instead of overwriting TARGET
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Print the merged dictionary instead of writing it
        #[arg(long)]
        dry_run: bool,
        /// Print the result object as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send one request body straight to the provider gateway
    ///
    /// REQUEST holds `{"sourceLang", "targetLang", "content", "context"?}`.
    Translate {
        request: PathBuf,
        #[arg(long)]
        provider: Option<ProviderKind>,
        #[arg(long)]
        model: Option<String>,
    },

    /// Sync every translation file under --root
    Workspace {
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dictionary(#[from] DictionaryError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("Cannot detect the language of '{}'. Pass it with --{flag}", path.display())]
    UnknownLanguage { path: PathBuf, flag: &'static str },

    #[error("Sync timed out after {0}s")]
    Timeout(u64),

    #[error("Failed to read request '{}': {message}", path.display())]
    Request { path: PathBuf, message: String },

    #[error(transparent)]
    InvalidRequest(GatewayError),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Runs one command. Returns whether everything it did succeeded.
pub async fn run(cli: Cli) -> Result<bool, CliError> {
    match cli.command {
        Command::Diff { source, target, obsolete, json } => diff(&source, &target, obsolete, json),
        Command::Sync {
            source,
            target,
            source_lang,
            target_lang,
            context,
            provider,
            model,
            output,
            dry_run,
            json,
        } => {
            let mut settings = load_settings(&cli.root)?;
            apply_overrides(&mut settings, provider, model, context);
            let source_lang = source_lang.or_else(|| settings.source_language.clone());
            let files = SyncFiles { source, target, output };
            sync(&settings, &files, source_lang, target_lang, dry_run, json).await
        }
        Command::Translate { request, provider, model } => {
            let mut settings = load_settings(&cli.root)?;
            apply_overrides(&mut settings, provider, model, None);
            translate(&settings, &request).await
        }
        Command::Workspace { dry_run, json } => {
            let settings = load_settings(&cli.root)?;
            workspace(&cli.root, settings, dry_run, json).await
        }
    }
}

fn load_settings(root: &Path) -> Result<SyncSettings, CliError> {
    let mut manager = ConfigManager::new();
    manager.load_settings(Some(root.to_path_buf()))?;
    Ok(manager.get_settings().clone())
}

/// Applies command-line flags on top of the config file.
///
/// Switching the provider kind drops every per-kind setting of the old kind.
fn apply_overrides(
    settings: &mut SyncSettings,
    provider: Option<ProviderKind>,
    model: Option<String>,
    context: Option<String>,
) {
    if let Some(kind) = provider
        && kind != settings.provider.kind
    {
        settings.provider = ProviderSettings { kind, ..ProviderSettings::default() };
    }
    if model.is_some() {
        settings.provider.model = model;
    }
    if context.is_some() {
        settings.context = context;
    }
}

fn build_provider(settings: &SyncSettings) -> Result<Arc<dyn Provider>, CliError> {
    Ok(provider::from_settings(&settings.provider, |name| std::env::var(name).ok())?)
}

fn diff(source: &Path, target: &Path, obsolete: bool, json: bool) -> Result<bool, CliError> {
    let source_dict = load_dictionary(source)?;
    let target_dict = load_dictionary(target)?;
    let result = diff_with(&source_dict, &target_dict, DiffOptions { collect_obsolete: obsolete });
    let skipped = find_untranslatable(&source_dict);
    let source_keys: usize = source_dict.values().map(count_translatable_leaves).sum();
    let target_keys = flatten(&target_dict).len();

    if json {
        let skipped: Vec<_> =
            skipped.iter().map(|(path, kind)| json!({ "path": path, "kind": kind.as_str() })).collect();
        let report = json!({
            "sourceKeys": source_keys,
            "targetKeys": target_keys,
            "missing": result.missing,
            "obsolete": result.obsolete,
            "skipped": skipped,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(true);
    }

    println!(
        "Translated {}/{source_keys} source keys ({target_keys} keys in target)",
        source_keys.saturating_sub(result.missing.len())
    );
    if result.missing.is_empty() {
        println!("No missing keys.");
    } else {
        println!("Missing ({}):", result.missing.len());
        for (path, value) in &result.missing {
            println!("  {path}: {value}");
        }
    }
    if !result.obsolete.is_empty() {
        println!("Obsolete ({}):", result.obsolete.len());
        for path in &result.obsolete {
            println!("  {path}");
        }
    }
    if !skipped.is_empty() {
        println!("Not translatable ({}):", skipped.len());
        for (path, kind) in &skipped {
            println!("  {path} ({})", kind.as_str());
        }
    }

    Ok(true)
}

struct SyncFiles {
    source: PathBuf,
    target: PathBuf,
    output: Option<PathBuf>,
}

fn resolve_language(explicit: Option<String>, path: &Path, flag: &'static str) -> Result<String, CliError> {
    explicit
        .or_else(|| detect_language_from_path(path))
        .ok_or_else(|| CliError::UnknownLanguage { path: path.to_path_buf(), flag })
}

async fn sync(
    settings: &SyncSettings,
    files: &SyncFiles,
    source_lang: Option<String>,
    target_lang: Option<String>,
    dry_run: bool,
    json: bool,
) -> Result<bool, CliError> {
    let source_lang = resolve_language(source_lang, &files.source, "source-lang")?;
    let target_lang = resolve_language(target_lang, &files.target, "target-lang")?;
    let source = load_dictionary(&files.source)?;
    let target = load_dictionary(&files.target)?;

    let gateway =
        ProviderGateway::new(build_provider(settings)?).with_max_keys(settings.batch.max_keys_per_request);
    let orchestrator = SyncOrchestrator::new(gateway).with_split_oversized(settings.batch.split_oversized);
    let request = SyncRequest {
        source: &source,
        target: &target,
        source_lang: &source_lang,
        target_lang: &target_lang,
        context: settings.context.as_deref(),
    };

    let outcome = tokio::time::timeout(settings.deadline(), orchestrator.sync(request))
        .await
        .map_err(|_| CliError::Timeout(settings.deadline_secs))?;

    let retryable = outcome.as_ref().err().is_some_and(GatewayError::is_retryable);
    if let Err(err) = &outcome {
        tracing::error!(kind = err.kind().as_str(), retryable, error = %err, "Sync failed");
    }
    if let Ok(report) = &outcome {
        for rejected in &report.errors {
            tracing::warn!(path = %rejected.path, reason = rejected.reason.as_str(), "Translation not merged");
        }
    }

    let result = SyncResult::from(outcome);
    let output_path = files.output.as_deref().unwrap_or(&files.target);
    match &result.merged_json {
        Some(merged) if dry_run && !json => print!("{}", to_pretty_json(merged)?),
        Some(merged) if !dry_run && (merged != &target || files.output.is_some()) => {
            save_dictionary(output_path, merged)?;
        }
        _ => {}
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.success {
        eprintln!("{}", result.message);
    } else if retryable {
        eprintln!("Error: {} Running the command again may succeed.", result.message);
    } else {
        eprintln!("Error: {}", result.message);
    }

    Ok(result.success)
}

async fn translate(settings: &SyncSettings, path: &Path) -> Result<bool, CliError> {
    let request_error = |message: String| CliError::Request { path: path.to_path_buf(), message };
    let text = tokio::fs::read_to_string(path).await.map_err(|err| request_error(err.to_string()))?;
    let body = serde_json::from_str(&text).map_err(|err| request_error(err.to_string()))?;
    let request = TranslationRequest::from_json(&body).map_err(CliError::InvalidRequest)?;

    let gateway =
        ProviderGateway::new(build_provider(settings)?).with_max_keys(settings.batch.max_keys_per_request);
    let outcome = tokio::time::timeout(settings.deadline(), gateway.translate_batch(&request))
        .await
        .map_err(|_| CliError::Timeout(settings.deadline_secs))?;

    match outcome {
        Ok(translations) => {
            println!("{}", serde_json::to_string_pretty(&translations)?);
            Ok(true)
        }
        Err(err) => {
            tracing::error!(
                kind = err.kind().as_str(),
                retryable = err.is_retryable(),
                error = %err,
                "Translate failed"
            );
            eprintln!("Error: {}", err.user_message());
            Ok(false)
        }
    }
}

async fn workspace(root: &Path, settings: SyncSettings, dry_run: bool, json: bool) -> Result<bool, CliError> {
    let provider = build_provider(&settings)?;
    let summaries = WorkspaceSyncer::new(root, settings, provider).with_dry_run(dry_run).run().await?;
    let failed = summaries.iter().filter(|s| s.status == FileSyncStatus::Failed).count();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            let status = match summary.status {
                FileSyncStatus::Updated => "updated",
                FileSyncStatus::WouldUpdate => "would update",
                FileSyncStatus::Unchanged => "unchanged",
                FileSyncStatus::Failed => "failed",
            };
            let path = summary.path.strip_prefix(root).unwrap_or(&summary.path);
            match &summary.error {
                Some(error) => println!("{status:>12}  {} [{}]: {error}", path.display(), summary.language),
                None => println!(
                    "{status:>12}  {} [{}] {}/{} keys",
                    path.display(),
                    summary.language,
                    summary.merged_count,
                    summary.requested_count
                ),
            }
        }
        println!("{} files, {failed} failed", summaries.len());
    }

    Ok(failed == 0)
}
