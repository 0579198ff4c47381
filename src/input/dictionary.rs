//! Dictionary file I/O
//!
//! The engine never touches the filesystem; callers load and save through
//! these helpers.

use std::path::{
    Path,
    PathBuf,
};

use jsonc_parser::ParseOptions;
use serde_json::Value;
use thiserror::Error;

use crate::types::Dictionary;

#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("Failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("The root of {origin} must be a JSON object")]
    NotAnObject { origin: String },

    #[error("Failed to serialize dictionary: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Parses dictionary text.
///
/// Strict JSON first; comments and trailing commas are accepted through a
/// lenient fallback. `origin` names the input in error messages.
///
/// # Errors
/// [`DictionaryError::Parse`] or [`DictionaryError::NotAnObject`].
pub fn parse_dictionary(text: &str, origin: &str) -> Result<Dictionary, DictionaryError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(strict_err) => {
            match jsonc_parser::parse_to_serde_value(text, &ParseOptions::default()) {
                Ok(Some(value)) => {
                    tracing::debug!(origin, "Parsed dictionary with the lenient parser");
                    value
                }
                Ok(None) => {
                    return Err(DictionaryError::Parse {
                        origin: origin.to_string(),
                        message: "file is empty".to_string(),
                    });
                }
                Err(_) => {
                    return Err(DictionaryError::Parse {
                        origin: origin.to_string(),
                        message: strict_err.to_string(),
                    });
                }
            }
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(DictionaryError::NotAnObject { origin: origin.to_string() }),
    }
}

/// Reads and parses a dictionary file.
///
/// # Errors
/// I/O, parse or shape errors.
pub fn load_dictionary(path: &Path) -> Result<Dictionary, DictionaryError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| DictionaryError::Io { path: path.to_path_buf(), source })?;
    parse_dictionary(&text, &path.display().to_string())
}

/// Two-space pretty JSON with a trailing newline. Key order is preserved.
///
/// # Errors
/// Serialization failure.
pub fn to_pretty_json(dictionary: &Dictionary) -> Result<String, DictionaryError> {
    let mut text = serde_json::to_string_pretty(dictionary)?;
    text.push('\n');
    Ok(text)
}

/// Writes `dictionary` to `path`, creating parent directories.
///
/// # Errors
/// I/O or serialization failure.
pub fn save_dictionary(path: &Path, dictionary: &Dictionary) -> Result<(), DictionaryError> {
    let text = to_pretty_json(dictionary)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|source| DictionaryError::Io { path: parent.to_path_buf(), source })?;
    }
    std::fs::write(path, text)
        .map_err(|source| DictionaryError::Io { path: path.to_path_buf(), source })?;
    tracing::debug!(path = %path.display(), keys = dictionary.len(), "Saved dictionary");
    Ok(())
}
