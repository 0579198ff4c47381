//! Core types shared by the diff, merge and provider layers.

use std::collections::BTreeMap;

use serde_json::{
    Map,
    Value,
};

/// One localization file: an insertion-ordered JSON object.
pub type Dictionary = Map<String, Value>;

/// Flat path -> source (or translated) string.
///
/// The only payload that ever crosses the provider boundary.
pub type MissingKeysMap = BTreeMap<String, String>;

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';

const ESCAPE: char = '\\';

/// Appends one key segment to `prefix`, escaping `.` and `\` inside the key.
///
/// Keys without either character produce the plain dotted path.
#[must_use]
pub fn join_path(prefix: Option<&str>, key: &str) -> String {
    let escaped = escape_segment(key);
    match prefix {
        Some(p) if !p.is_empty() => format!("{p}{PATH_SEPARATOR}{escaped}"),
        _ => escaped,
    }
}

fn escape_segment(key: &str) -> String {
    if !key.contains([PATH_SEPARATOR, ESCAPE]) {
        return key.to_string();
    }
    let mut out = String::with_capacity(key.len() + 2);
    for c in key.chars() {
        if c == PATH_SEPARATOR || c == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Why a flat path could not be split into segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSyntaxError {
    Empty,
    EmptySegment,
    DanglingEscape,
}

/// Splits a flat path on unescaped separators and unescapes each segment.
///
/// # Errors
/// Empty paths, empty segments (leading, trailing or doubled separators) and a
/// trailing lone `\` are rejected.
pub fn split_path(path: &str) -> Result<Vec<String>, PathSyntaxError> {
    if path.is_empty() {
        return Err(PathSyntaxError::Empty);
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some(next) => current.push(next),
                None => return Err(PathSyntaxError::DanglingEscape),
            },
            PATH_SEPARATOR => {
                if current.is_empty() {
                    return Err(PathSyntaxError::EmptySegment);
                }
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if current.is_empty() {
        return Err(PathSyntaxError::EmptySegment);
    }
    segments.push(current);

    Ok(segments)
}

/// Returns true for segments shaped like an array index (`^\d+$`).
#[must_use]
pub fn is_index_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}
