//! Shadow presets and rounded corner radii.

use iced::{Shadow, Vector};

use super::palette;

/// Rounded corner radii.
pub mod radius {
    pub const NONE: f32 = 0.0;
    pub const SMALL: f32 = 4.0;
    pub const MEDIUM: f32 = 8.0;
    pub const LARGE: f32 = 12.0;
    pub const PILL: f32 = 9999.0;
}

pub fn none() -> Shadow {
    Shadow::default()
}

/// Resting elevation for bubbles and cards.
pub fn subtle() -> Shadow {
    Shadow {
        color: palette::current().shadow,
        offset: Vector::new(0.0, 1.0),
        blur_radius: 4.0,
    }
}

/// Floating elevation for toasts and the viewer toolbar.
pub fn floating() -> Shadow {
    Shadow {
        color: palette::current().shadow,
        offset: Vector::new(0.0, 6.0),
        blur_radius: 18.0,
    }
}
