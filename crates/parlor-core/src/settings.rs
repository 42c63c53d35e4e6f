//! User settings that affect rendering and image handling.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Application directory name under the platform config/data dirs.
const APP_DIR: &str = "parlor";

/// Math rendering engine for Markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MathEngine {
    /// `KaTeX` syntax.
    #[default]
    KaTeX,
    /// `MathJax` syntax.
    MathJax,
    /// No math support.
    #[serde(rename = "none")]
    None,
}

impl MathEngine {
    /// Returns true if math parsing is enabled.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Settings read by the rendering and localization code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Download remote images into local storage automatically.
    pub auto_localize_images: bool,
    /// Root directory of the blob storage.
    pub files_path: PathBuf,
    /// Math engine used by Markdown rendering.
    pub math_engine: MathEngine,
    /// Treat `$...$` as inline math.
    pub math_enable_single_dollar: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_localize_images: true,
            files_path: data_dir().join("Files"),
            math_engine: MathEngine::default(),
            math_enable_single_dollar: true,
        }
    }
}

/// Platform data directory for Parlor (`<data_dir>/parlor`).
#[must_use]
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Platform config directory for Parlor (`<config_dir>/parlor`).
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Default settings file path.
#[must_use]
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Load a JSON settings document, returning defaults if the file is missing.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub async fn load<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    if !tokio::fs::try_exists(path).await? {
        return Ok(T::default());
    }

    let contents = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&contents).map_err(Into::into)
}

/// Save a settings document as pretty JSON, creating parent directories.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn save<T: Serialize + Sync>(path: &Path, settings: &T) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::Config(format!("{} has no parent directory", path.display())))?;
    tokio::fs::create_dir_all(parent).await?;

    let contents = serde_json::to_string_pretty(settings)?;
    tokio::fs::write(path, contents).await?;

    tracing::info!("Settings saved to {:?}", path);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings: Settings = load(&dir.path().join("settings.json")).await.unwrap();
        assert!(settings.auto_localize_images);
        assert_eq!(settings.math_engine, MathEngine::KaTeX);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            auto_localize_images: false,
            files_path: PathBuf::from("/srv/files"),
            math_engine: MathEngine::None,
            math_enable_single_dollar: false,
        };

        save(&path, &settings).await.unwrap();
        let loaded: Settings = load(&path).await.unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "auto_localize_images": false, "math_engine": "none" }"#)
                .unwrap();
        assert!(!settings.auto_localize_images);
        assert!(!settings.math_engine.is_enabled());
        assert!(settings.math_enable_single_dollar);
    }
}
