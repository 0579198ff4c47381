//! Owns the active settings

use std::path::PathBuf;

use super::{
    ConfigError,
    SyncSettings,
    loader,
};

#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    current_settings: SyncSettings,
    workspace_root: Option<PathBuf>,
}

impl ConfigManager {
    #[must_use]
    pub fn new() -> Self {
        Self { current_settings: SyncSettings::default(), workspace_root: None }
    }

    /// Loads and validates the settings of `workspace_root`.
    ///
    /// Falls back to defaults when there is no workspace or no config file.
    ///
    /// # Errors
    /// - File read error
    /// - JSON parse error
    /// - Validation error
    pub fn load_settings(&mut self, workspace_root: Option<PathBuf>) -> Result<(), ConfigError> {
        tracing::debug!("Loading settings for workspace: {:?}", workspace_root);

        let settings = if let Some(root) = &workspace_root {
            loader::load_from_workspace(root)?.map_or_else(SyncSettings::default, |ws| {
                tracing::debug!("Loaded workspace settings: {:?}", ws);
                ws
            })
        } else {
            SyncSettings::default()
        };

        settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = settings;
        self.workspace_root = workspace_root;
        tracing::debug!("Settings loaded successfully: {:?}", self.current_settings);

        Ok(())
    }

    /// Replaces the settings, e.g. after applying CLI overrides.
    ///
    /// # Errors
    /// Validation error; the previous settings stay active.
    pub fn update_settings(&mut self, new_settings: SyncSettings) -> Result<(), ConfigError> {
        tracing::debug!("Updating settings...");

        new_settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = new_settings;
        tracing::debug!("Settings updated successfully");

        Ok(())
    }

    #[must_use]
    pub const fn get_settings(&self) -> &SyncSettings {
        &self.current_settings
    }

    #[must_use]
    pub const fn workspace_root(&self) -> Option<&PathBuf> {
        self.workspace_root.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;
    use crate::config::{
        CONFIG_FILE_NAME,
        ProviderKind,
    };

    #[rstest]
    fn test_new_creates_default_settings() {
        let manager = ConfigManager::new();

        assert_eq!(manager.get_settings().source_file, "locales/en.json");
        assert!(manager.workspace_root().is_none());
    }

    #[rstest]
    fn test_load_settings_without_workspace() {
        let mut manager = ConfigManager::new();

        let result = manager.load_settings(None);

        assert!(result.is_ok());
        assert_eq!(manager.get_settings().provider.kind, ProviderKind::Groq);
        assert!(manager.workspace_root().is_none());
    }

    #[rstest]
    fn test_load_settings_with_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_content = r#"{"provider": {"kind": "mock"}, "targetLanguages": ["ja"]}"#;
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), config_content).unwrap();

        let mut manager = ConfigManager::new();
        let result = manager.load_settings(Some(temp_dir.path().to_path_buf()));

        assert!(result.is_ok());
        assert_eq!(manager.get_settings().provider.kind, ProviderKind::Mock);
        assert_eq!(manager.get_settings().target_languages, Some(vec!["ja".to_string()]));
        assert!(manager.workspace_root().is_some());
    }

    #[rstest]
    fn test_load_settings_rejects_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), r#"{"deadlineSecs": 0}"#).unwrap();

        let mut manager = ConfigManager::new();
        let result = manager.load_settings(Some(temp_dir.path().to_path_buf()));

        assert!(matches!(result, Err(ConfigError::ValidationErrors(_))));
        assert!(manager.workspace_root().is_none());
    }

    #[rstest]
    fn test_update_settings_valid() {
        let mut manager = ConfigManager::new();
        let new_settings = SyncSettings { context: Some("Dashboard".to_string()), ..SyncSettings::default() };

        let result = manager.update_settings(new_settings);

        assert!(result.is_ok());
        assert_eq!(manager.get_settings().context.as_deref(), Some("Dashboard"));
    }

    #[rstest]
    fn test_update_settings_invalid() {
        let mut manager = ConfigManager::new();
        let new_settings = SyncSettings { source_file: String::new(), ..SyncSettings::default() };

        let result = manager.update_settings(new_settings);

        assert!(result.is_err());
        assert_eq!(manager.get_settings().source_file, "locales/en.json");
    }
}
