//! Config file loading

use std::path::Path;

use super::{
    ConfigError,
    SyncSettings,
};

/// File name looked up at the workspace root.
pub const CONFIG_FILE_NAME: &str = ".json-i18n-sync.json";

/// Loads settings from the workspace root.
///
/// # Returns
/// - `Ok(Some(settings))`: config file found and parsed
/// - `Ok(None)`: no config file
///
/// # Errors
/// - File read error
/// - JSON parse error
pub(super) fn load_from_workspace(
    workspace_root: &Path,
) -> Result<Option<SyncSettings>, ConfigError> {
    let config_path = workspace_root.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!("Configuration file not found: {:?}", config_path);
        return Ok(None);
    }

    tracing::debug!("Loading configuration from: {:?}", config_path);

    let content = std::fs::read_to_string(&config_path)?;
    let settings: SyncSettings = serde_json::from_str(&content)?;

    Ok(Some(settings))
}
