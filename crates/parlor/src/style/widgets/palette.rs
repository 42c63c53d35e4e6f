//! Color palette with light and dark theme support.

use iced::Color;

/// Application theme mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeMode {
    /// Light theme.
    Light,
    /// Dark theme (default).
    #[default]
    Dark,
}

impl ThemeMode {
    /// The other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Complete color palette for the application.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub primary: Color,
    pub primary_hover: Color,
    pub text_on_primary: Color,

    pub background: Color,
    pub surface: Color,
    pub surface_raised: Color,
    pub code_background: Color,
    pub user_bubble: Color,

    pub text_primary: Color,
    pub text_secondary: Color,
    pub text_muted: Color,
    pub link: Color,

    pub success: Color,
    pub danger: Color,

    pub hover: Color,
    pub selected: Color,
    pub border: Color,
    pub border_strong: Color,

    /// Backdrop behind the image preview.
    pub overlay: Color,
    pub shadow: Color,
}

impl Palette {
    /// Creates the light theme palette.
    #[must_use]
    pub const fn light() -> Self {
        Self {
            primary: Color::from_rgb(0.09, 0.47, 0.42),
            primary_hover: Color::from_rgb(0.13, 0.56, 0.50),
            text_on_primary: Color::WHITE,

            background: Color::from_rgb(0.97, 0.97, 0.96),
            surface: Color::WHITE,
            surface_raised: Color::from_rgb(0.99, 0.99, 0.98),
            code_background: Color::from_rgb(0.94, 0.94, 0.93),
            user_bubble: Color::from_rgb(0.90, 0.95, 0.94),

            text_primary: Color::from_rgb(0.11, 0.12, 0.13),
            text_secondary: Color::from_rgb(0.38, 0.40, 0.43),
            text_muted: Color::from_rgb(0.58, 0.60, 0.63),
            link: Color::from_rgb(0.05, 0.42, 0.78),

            success: Color::from_rgb(0.16, 0.62, 0.36),
            danger: Color::from_rgb(0.85, 0.24, 0.27),

            hover: Color::from_rgb(0.94, 0.95, 0.95),
            selected: Color::from_rgb(0.88, 0.94, 0.93),
            border: Color::from_rgb(0.89, 0.89, 0.88),
            border_strong: Color::from_rgb(0.76, 0.77, 0.77),

            overlay: Color::from_rgba(0.0, 0.0, 0.0, 0.82),
            shadow: Color::from_rgba(0.0, 0.0, 0.0, 0.08),
        }
    }

    /// Creates the dark theme palette.
    #[must_use]
    pub const fn dark() -> Self {
        Self {
            primary: Color::from_rgb(0.30, 0.78, 0.69),
            primary_hover: Color::from_rgb(0.40, 0.85, 0.77),
            text_on_primary: Color::from_rgb(0.06, 0.08, 0.08),

            background: Color::from_rgb(0.09, 0.09, 0.10),
            surface: Color::from_rgb(0.12, 0.12, 0.13),
            surface_raised: Color::from_rgb(0.16, 0.16, 0.17),
            code_background: Color::from_rgb(0.07, 0.07, 0.08),
            user_bubble: Color::from_rgb(0.14, 0.20, 0.19),

            text_primary: Color::from_rgb(0.91, 0.92, 0.92),
            text_secondary: Color::from_rgb(0.66, 0.68, 0.70),
            text_muted: Color::from_rgb(0.48, 0.50, 0.53),
            link: Color::from_rgb(0.45, 0.70, 1.0),

            success: Color::from_rgb(0.30, 0.82, 0.52),
            danger: Color::from_rgb(1.0, 0.42, 0.44),

            hover: Color::from_rgb(0.17, 0.17, 0.19),
            selected: Color::from_rgb(0.14, 0.22, 0.21),
            border: Color::from_rgb(0.21, 0.21, 0.23),
            border_strong: Color::from_rgb(0.34, 0.35, 0.37),

            overlay: Color::from_rgba(0.0, 0.0, 0.0, 0.88),
            shadow: Color::from_rgba(0.0, 0.0, 0.0, 0.30),
        }
    }

    /// Gets the palette for a given theme mode.
    #[must_use]
    pub const fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Light => Self::light(),
            ThemeMode::Dark => Self::dark(),
        }
    }
}

/// Current active palette.
pub static CURRENT: std::sync::LazyLock<std::sync::RwLock<Palette>> =
    std::sync::LazyLock::new(|| std::sync::RwLock::new(Palette::dark()));

/// Sets the current global palette.
pub fn set_theme(mode: ThemeMode) {
    if let Ok(mut palette) = CURRENT.write() {
        *palette = Palette::for_mode(mode);
    }
}

/// Gets a copy of the current palette.
#[must_use]
pub fn current() -> Palette {
    CURRENT.read().map_or_else(|_| Palette::dark(), |p| *p)
}
