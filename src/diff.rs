//! Tree diff between a source and a target dictionary.
//!
//! Only string leaves reachable through objects are translatable. Arrays are
//! terminal at every depth and nothing beneath them is ever reported.

use serde_json::Value;

use crate::types::{
    Dictionary,
    MissingKeysMap,
    join_path,
};

/// Options for [`diff_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Also list target keys that the source no longer defines.
    pub collect_obsolete: bool,
}

/// Result of [`diff_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Source leaves without a valid counterpart in the target.
    pub missing: MissingKeysMap,
    /// Target paths absent from the source. Empty unless requested.
    pub obsolete: Vec<String>,
}

/// Finds every translatable source leaf that is missing from `target`.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use json_i18n_sync::diff::find_missing;
///
/// let source = json!({ "app": { "title": "Hello", "desc": "Desc" } });
/// let target = json!({ "app": { "title": "你好" } });
///
/// let missing = find_missing(
///     source.as_object().unwrap(),
///     target.as_object().unwrap(),
/// );
/// assert_eq!(missing.get("app.desc"), Some(&"Desc".to_string()));
/// assert_eq!(missing.len(), 1);
/// ```
#[must_use]
pub fn find_missing(source: &Dictionary, target: &Dictionary) -> MissingKeysMap {
    diff_with(source, target, DiffOptions::default()).missing
}

/// Diffs `source` against `target`, optionally collecting obsolete keys.
#[must_use]
pub fn diff_with(source: &Dictionary, target: &Dictionary, options: DiffOptions) -> DiffResult {
    let mut result = DiffResult::default();
    diff_objects(source, target, None, options, &mut result);
    tracing::debug!(
        missing = result.missing.len(),
        obsolete = result.obsolete.len(),
        "Diff complete"
    );
    result
}

fn diff_objects(
    source: &Dictionary,
    target: &Dictionary,
    prefix: Option<&str>,
    options: DiffOptions,
    result: &mut DiffResult,
) {
    for (key, source_value) in source {
        let current_path = join_path(prefix, key);

        match (source_value, target.get(key)) {
            (_, None | Some(Value::Null)) => {
                collect_translatable(source_value, &current_path, &mut result.missing);
            }
            (Value::Object(source_child), Some(Value::Object(target_child))) => {
                diff_objects(source_child, target_child, Some(&current_path), options, result);
            }
            (_, Some(target_value)) => {
                if !same_variant(source_value, target_value) {
                    collect_translatable(source_value, &current_path, &mut result.missing);
                }
            }
        }
    }

    if options.collect_obsolete {
        for key in target.keys() {
            if !source.contains_key(key) {
                result.obsolete.push(join_path(prefix, key));
            }
        }
    }
}

const fn same_variant(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Null, Value::Null)
            | (Value::Bool(_), Value::Bool(_))
            | (Value::Number(_), Value::Number(_))
            | (Value::String(_), Value::String(_))
            | (Value::Array(_), Value::Array(_))
            | (Value::Object(_), Value::Object(_))
    )
}

/// Adds `value` to `out` if it is a string, or every string leaf under it if
/// it is an object. Anything else is dropped.
fn collect_translatable(value: &Value, path: &str, out: &mut MissingKeysMap) {
    match value {
        Value::String(s) => {
            out.insert(path.to_string(), s.clone());
        }
        Value::Object(map) => {
            for (key, child) in map {
                collect_translatable(child, &join_path(Some(path), key), out);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) => {}
    }
}

/// Flattens every string leaf of `dictionary` into a [`MissingKeysMap`].
#[must_use]
pub fn flatten(dictionary: &Dictionary) -> MissingKeysMap {
    let mut out = MissingKeysMap::new();
    for (key, value) in dictionary {
        collect_translatable(value, &join_path(None, key), &mut out);
    }
    out
}

/// Counts the string leaves reachable through objects.
#[must_use]
pub fn count_translatable_leaves(value: &Value) -> usize {
    match value {
        Value::String(_) => 1,
        Value::Object(map) => map.values().map(count_translatable_leaves).sum(),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) => 0,
    }
}

/// Kind of a value the engine will never translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UntranslatableKind {
    Array,
    Number,
    Boolean,
}

impl UntranslatableKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// Lists the paths of array, number and boolean values in `source`.
///
/// Arrays are reported once and not descended into.
#[must_use]
pub fn find_untranslatable(source: &Dictionary) -> Vec<(String, UntranslatableKind)> {
    let mut issues = Vec::new();
    collect_untranslatable(source, None, &mut issues);
    issues
}

fn collect_untranslatable(
    map: &Dictionary,
    prefix: Option<&str>,
    issues: &mut Vec<(String, UntranslatableKind)>,
) {
    for (key, value) in map {
        let path = join_path(prefix, key);
        match value {
            Value::Array(_) => issues.push((path, UntranslatableKind::Array)),
            Value::Number(_) => issues.push((path, UntranslatableKind::Number)),
            Value::Bool(_) => issues.push((path, UntranslatableKind::Boolean)),
            Value::Object(child) => collect_untranslatable(child, Some(&path), issues),
            Value::Null | Value::String(_) => {}
        }
    }
}
