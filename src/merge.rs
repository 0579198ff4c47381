//! Overwrite-safe merge of translated flat paths into a dictionary.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::types::{
    Dictionary,
    MissingKeysMap,
    is_index_segment,
    split_path,
};

/// Why a single entry was not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeErrorReason {
    ArrayNotSupported,
    OverwriteBlocked,
    InvalidPath,
}

impl MergeErrorReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ArrayNotSupported => "array_not_supported",
            Self::OverwriteBlocked => "overwrite_blocked",
            Self::InvalidPath => "invalid_path",
        }
    }
}

impl fmt::Display for MergeErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected entry. Collected, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeError {
    pub path: String,
    pub reason: MergeErrorReason,
    pub value: String,
}

/// Options for [`merge_translations`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Allow replacing values that already exist. Off by default.
    pub overwrite: bool,
}

/// Result of [`merge_translations`].
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Deep copy of the target with every successful write applied.
    pub merged: Dictionary,
    pub errors: Vec<MergeError>,
}

impl MergeOutcome {
    /// Number of entries that were actually written.
    #[must_use]
    pub fn written(&self, requested: usize) -> usize {
        requested.saturating_sub(self.errors.len())
    }
}

/// Writes each `(path, value)` of `translated` into a copy of `target`.
///
/// Never panics and never touches `target`; every rejection becomes a
/// [`MergeError`] in the outcome.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use json_i18n_sync::merge::{merge_translations, MergeOptions};
/// use json_i18n_sync::types::MissingKeysMap;
///
/// let target = json!({ "common": { "confirm": "Confirm" } });
/// let target = target.as_object().unwrap();
/// let translated = MissingKeysMap::from([
///     ("errors.404.title".to_string(), "Not Found".to_string()),
/// ]);
///
/// let outcome = merge_translations(target, &translated, MergeOptions::default());
/// assert_eq!(outcome.merged["errors"], json!({ "404": { "title": "Not Found" } }));
/// assert!(outcome.errors.is_empty());
/// ```
#[must_use]
pub fn merge_translations(
    target: &Dictionary,
    translated: &MissingKeysMap,
    options: MergeOptions,
) -> MergeOutcome {
    let mut merged = target.clone();
    let mut errors = Vec::new();

    for (path, value) in translated {
        if let Err(reason) = set_value_by_path(&mut merged, path, value, options) {
            tracing::warn!(path = %path, reason = %reason, "Skipped merge entry");
            errors.push(MergeError { path: path.clone(), reason, value: value.clone() });
        }
    }

    MergeOutcome { merged, errors }
}

fn set_value_by_path(
    root: &mut Dictionary,
    path: &str,
    value: &str,
    options: MergeOptions,
) -> Result<(), MergeErrorReason> {
    let segments = split_path(path).map_err(|_| MergeErrorReason::InvalidPath)?;
    let Some((last, parents)) = segments.split_last() else {
        return Err(MergeErrorReason::InvalidPath);
    };

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        let next_segment = segments.get(depth + 1).map_or(last.as_str(), String::as_str);
        let slot = current.entry(segment.clone()).or_insert(Value::Null);

        if matches!(slot, Value::Array(_)) && is_index_segment(next_segment) {
            return Err(MergeErrorReason::ArrayNotSupported);
        }
        if !slot.is_object() {
            *slot = Value::Object(Dictionary::new());
        }
        let Value::Object(child) = slot else {
            return Err(MergeErrorReason::InvalidPath);
        };
        current = child;
    }

    let occupied = current.get(last).is_some_and(|existing| !existing.is_null());
    if occupied && !options.overwrite {
        return Err(MergeErrorReason::OverwriteBlocked);
    }
    current.insert(last.clone(), Value::String(value.to_string()));

    Ok(())
}
