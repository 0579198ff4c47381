//! Recovery of JSON from chatty model output.
//!
//! Models wrap JSON in Markdown fences, leave trailing commas, or stop
//! mid-object when they hit a token limit. [`parse_lenient`] tries a strict
//! parse first and only then falls back to structural repair.

use jsonc_parser::ParseOptions;
use serde_json::Value;

const FENCE: &str = "```";

/// Removes a surrounding Markdown code fence, with or without a language tag.
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix(FENCE) {
        // drop the info string (`json`, `JSON`, ...) up to the first newline
        text = rest.split_once('\n').map_or(rest, |(_, body)| body);
    }
    if let Some(rest) = text.trim_end().strip_suffix(FENCE) {
        text = rest;
    }

    text.trim()
}

/// Characters that may follow a backslash inside a JSON string.
const ESCAPABLE: [char; 9] = ['"', '\\', '/', 'b', 'f', 'n', 'r', 't', 'u'];

/// Upper bound on the `{` positions [`parse_lenient`] tries as the start of
/// the payload.
const MAX_CANDIDATES: usize = 8;

/// Best-effort structural repair.
///
/// Starts at the first `{`, drops trailing commas, doubles stray backslashes
/// inside strings, stops after the root object closes, and closes whatever
/// is still open at end of input.
#[must_use]
pub fn repair_json(raw: &str) -> String {
    let text = strip_code_fences(raw);
    match text.find('{').and_then(|start| text.get(start..)) {
        Some(body) => repair_from(body),
        None => text.to_string(),
    }
}

fn repair_from(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 8);
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
            } else if c == '\\' {
                match chars.peek() {
                    // `\.` from an escaped dotted key
                    Some(next) if !ESCAPABLE.contains(next) => out.push_str("\\\\"),
                    _ => {
                        escaped = true;
                        out.push(c);
                    }
                }
            } else {
                out.push(c);
                if c == '"' {
                    in_string = false;
                }
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' => {
                closers.push('}');
                out.push(c);
            }
            '[' => {
                closers.push(']');
                out.push(c);
            }
            '}' | ']' => {
                drop_trailing_comma(&mut out);
                let closer = closers.pop().unwrap_or(c);
                out.push(closer);
                if closers.is_empty() {
                    return out;
                }
            }
            _ => out.push(c),
        }
    }

    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }

    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    if out.ends_with(':') {
        out.push_str(" null");
    }
    while let Some(closer) = closers.pop() {
        drop_trailing_comma(&mut out);
        out.push(closer);
    }

    out
}

fn drop_trailing_comma(out: &mut String) {
    let trimmed = out.trim_end();
    if let Some(without_comma) = trimmed.strip_suffix(',') {
        let len = without_comma.len();
        out.truncate(len);
    }
}

/// Parses model output, repairing it if needed.
///
/// Prose may contain braces of its own, so each `{` is tried in turn as the
/// start of the payload. Returns `None` when nothing usable could be
/// recovered.
#[must_use]
pub fn parse_lenient(raw: &str) -> Option<Value> {
    let stripped = strip_code_fences(raw);
    if let Ok(value) = serde_json::from_str::<Value>(stripped) {
        return Some(value);
    }

    stripped
        .match_indices('{')
        .take(MAX_CANDIDATES)
        .filter_map(|(start, _)| stripped.get(start..))
        .find_map(|body| parse_repaired(&repair_from(body)))
}

fn parse_repaired(repaired: &str) -> Option<Value> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(repaired) {
        tracing::debug!("Recovered provider output with structural repair");
        return Some(value);
    }

    match jsonc_parser::parse_to_serde_value(repaired, &ParseOptions::default()) {
        Ok(Some(value @ Value::Object(_))) => {
            tracing::debug!("Recovered provider output with lenient parser");
            Some(value)
        }
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(error = %err, "Lenient parse failed");
            None
        }
    }
}
