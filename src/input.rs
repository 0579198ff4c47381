//! Dictionary files and the languages they are written in
/// Reading and writing dictionary files
pub mod dictionary;
/// Language catalog and detection
pub mod language;
