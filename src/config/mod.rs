use crate::models::UserConfig;
use crate::state::persistence::SNAPSHOT_FILE_NAME;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Name of the user configuration file inside the data directory.
pub const USER_CONFIG_FILE_NAME: &str = "Spelling Config.yaml";

/// Configuration manager for the SpellQuest data directory.
///
/// The data directory holds:
/// - User config (`Spelling Config.yaml`): Gameplay, speech and logging settings
/// - Game snapshot (`spellquest-state.json`): Written by the state store
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    user_config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified data directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing configuration files (e.g., "SpellQuest Data")
    ///
    /// # Returns
    /// A new ConfigManager instance; the directory is created if missing
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            user_config_path: config_dir.join(USER_CONFIG_FILE_NAME),
            config_dir,
        })
    }

    /// Load the user configuration file.
    ///
    /// # Returns
    /// The loaded UserConfig, or default if file doesn't exist
    pub fn load_user_config(&self) -> Result<UserConfig> {
        if !self.user_config_path.exists() {
            tracing::warn!(
                "User config file not found at {}, using defaults",
                self.user_config_path
            );
            return Ok(UserConfig::default());
        }

        let file_contents = fs::read_to_string(&self.user_config_path)
            .with_context(|| format!("Failed to read user config: {}", self.user_config_path))?;

        let config: UserConfig = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse user config: {}", self.user_config_path))?;

        tracing::info!("Loaded user config from {}", self.user_config_path);
        Ok(config)
    }

    /// Save the user configuration file.
    ///
    /// # Arguments
    /// * `config` - The UserConfig to save
    pub fn save_user_config(&self, config: &UserConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize user config to YAML")?;

        fs::write(&self.user_config_path, yaml_string)
            .with_context(|| format!("Failed to write user config: {}", self.user_config_path))?;

        tracing::info!("Saved user config to {}", self.user_config_path);
        Ok(())
    }

    /// Load the user config, writing a default file first if none exists.
    pub fn load_or_create_user_config(&self) -> Result<UserConfig> {
        if self.user_config_path.exists() {
            return self.load_user_config();
        }

        let config = UserConfig::default();
        self.save_user_config(&config)?;
        Ok(config)
    }

    /// Where the state store keeps its snapshot.
    pub fn snapshot_path(&self) -> Utf8PathBuf {
        self.config_dir.join(SNAPSHOT_FILE_NAME)
    }

    pub fn user_config_path(&self) -> &Utf8Path {
        &self.user_config_path
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_create_config_manager() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert!(manager.config_dir().exists());
        assert!(manager.snapshot_path().ends_with(SNAPSHOT_FILE_NAME));
    }

    #[test]
    fn test_missing_user_config_uses_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();

        let loaded = manager.load_user_config().unwrap();
        assert_eq!(loaded.gameplay.words_per_level, 5);
        assert!(!manager.user_config_path().exists());
    }

    #[test]
    fn test_load_save_user_config() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut config = UserConfig::default();
        config.speech.rate = 110;
        config.gameplay.points_hard = 50;
        manager.save_user_config(&config).unwrap();

        let loaded = manager.load_user_config().unwrap();
        assert_eq!(loaded.speech.rate, 110);
        assert_eq!(loaded.gameplay.points_hard, 50);
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();

        manager.load_or_create_user_config().unwrap();
        assert!(manager.user_config_path().exists());
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(manager.user_config_path(), "Gameplay: [unclosed").unwrap();

        let err = manager.load_user_config().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse user config"));
    }
}
