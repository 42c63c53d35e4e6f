//! Settings model.

use parlor_core::Settings;

use crate::style::widgets::palette::ThemeMode;

/// State for the settings screen.
#[derive(Debug, Clone, Default)]
pub struct SettingsState {
    /// Selected settings section.
    pub selected_section: SettingsSection,
}

/// Settings sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsSection {
    /// Image handling.
    #[default]
    Images,
    /// Markdown and math rendering.
    Markdown,
    /// Appearance settings.
    Appearance,
    /// About the application.
    About,
}

/// Application settings that persist across sessions.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Current theme mode (serialized as string).
    #[serde(with = "theme_mode_serde")]
    pub theme_mode: ThemeMode,
    /// Rendering and localization settings shared with the core library.
    #[serde(flatten)]
    pub core: Settings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme_mode: ThemeMode::Dark,
            core: Settings::default(),
        }
    }
}

/// Serde helpers for `ThemeMode`, which lives in the style module.
mod theme_mode_serde {
    use super::ThemeMode;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)] // Required by serde with= signature
    pub fn serialize<S>(mode: &ThemeMode, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(match mode {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<ThemeMode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(if s == "light" {
            ThemeMode::Light
        } else {
            ThemeMode::Dark
        })
    }
}

impl SettingsState {
    /// Creates a new settings state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
