//! Application configuration.
//!
//! Values are layered: built-in defaults, then `config.toml` in the user's
//! config directory, then `GAMEVAULT_*` environment variables (nested keys
//! separated by `__`, e.g. `GAMEVAULT_THEME__ACCENT`).

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{models::DEFAULT_PLATFORMS, store::LibraryStore};

/// Directory name used under the config and data directories.
pub const APP_DIR: &str = "gamevault";
/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "GAMEVAULT";

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backing file of the game library.
    pub library_path: PathBuf,
    /// Directory receiving `gamevault.log`.
    pub log_dir: PathBuf,
    /// Platform suggestions offered by the form.
    pub platforms: Vec<String>,
    /// Colour palette.
    pub theme: ThemeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            library_path: LibraryStore::default_path(),
            log_dir: data_root().join("logs"),
            platforms: DEFAULT_PLATFORMS.iter().map(|p| p.to_string()).collect(),
            theme: ThemeConfig::default(),
        }
    }
}

/// Colours as `#rrggbb` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ThemeConfig {
    pub background: String,
    pub panel: String,
    pub header: String,
    pub accent: String,
    pub accent_alt: String,
    pub text: String,
    pub muted: String,
    pub success: String,
    pub warning: String,
    pub danger: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            background: "#2b2b2b".to_string(),
            panel: "#3c3c3c".to_string(),
            header: "#1e1e1e".to_string(),
            accent: "#6a5acd".to_string(),
            accent_alt: "#836fff".to_string(),
            text: "#ffffff".to_string(),
            muted: "#cccccc".to_string(),
            success: "#32cd32".to_string(),
            warning: "#ffd700".to_string(),
            danger: "#ff4500".to_string(),
        }
    }
}

impl AppConfig {
    /// Directory holding the configuration file.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join(CONFIG_FILE_NAME)
    }

    /// Load from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path` (which may be absent) plus environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        let mut config: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        let defaults = AppConfig::default();
        if self.library_path.as_os_str().is_empty() {
            self.library_path = defaults.library_path;
        }
        if self.log_dir.as_os_str().is_empty() {
            self.log_dir = defaults.log_dir;
        }
        self.platforms = self
            .platforms
            .iter()
            .map(|platform| platform.trim().to_string())
            .filter(|platform| !platform.is_empty())
            .collect();
        if self.platforms.is_empty() {
            self.platforms = defaults.platforms;
        }
    }
}

fn data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Write a commented default configuration file unless one exists.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = AppConfig::config_path();
    write_default_config(&path)?;
    Ok(path)
}

/// Write the default template to `path`. Returns `false` when the file already existed.
pub fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, default_template(&AppConfig::default()))
        .with_context(|| format!("failed to write config {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(true)
}

fn default_template(defaults: &AppConfig) -> String {
    let platforms = defaults
        .platforms
        .iter()
        .map(|platform| format!("\"{platform}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let theme = &defaults.theme;
    format!(
        r#"# Game Vault configuration.
# Every key is optional; remove the leading '#' to override a default.
# Environment variables such as GAMEVAULT_LIBRARY_PATH take precedence.

# library_path = '{library}'
# log_dir = '{logs}'
# platforms = [{platforms}]

[theme]
# background = "{background}"
# panel = "{panel}"
# header = "{header}"
# accent = "{accent}"
# accent_alt = "{accent_alt}"
# text = "{text}"
# muted = "{muted}"
# success = "{success}"
# warning = "{warning}"
# danger = "{danger}"
"#,
        library = defaults.library_path.display(),
        logs = defaults.log_dir.display(),
        background = theme.background,
        panel = theme.panel,
        header = theme.header,
        accent = theme.accent,
        accent_alt = theme.accent_alt,
        text = theme.text,
        muted = theme.muted,
        success = theme.success,
        warning = theme.warning,
        danger = theme.danger,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_template_loads_as_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(write_default_config(&path)?);
        assert!(!write_default_config(&path)?);

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.platforms, AppConfig::default().platforms);
        assert_eq!(config.theme, ThemeConfig::default());
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r##"
library_path = '/srv/games/library.json'
platforms = ["Steam", " ", "itch.io"]

[theme]
accent = "#ff00ff"
"##,
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.library_path, PathBuf::from("/srv/games/library.json"));
        assert_eq!(config.platforms, ["Steam", "itch.io"]);
        assert_eq!(config.theme.accent, "#ff00ff");
        assert_eq!(config.theme.panel, ThemeConfig::default().panel);
        Ok(())
    }

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(&dir.path().join("absent.toml"))?;
        assert_eq!(config.theme, ThemeConfig::default());
        assert!(!config.platforms.is_empty());
        Ok(())
    }
}
