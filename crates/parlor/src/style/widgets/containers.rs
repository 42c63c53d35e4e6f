//! Container style functions with theme support.

use iced::widget::container;
use iced::{Background, Border, Color};

use super::palette;
use super::shadows;
use super::shadows::radius;
use crate::model::ToastKind;

/// Sidebar with a right border.
pub fn sidebar_style(_theme: &iced::Theme) -> container::Style {
    let p = palette::current();

    container::Style {
        background: Some(Background::Color(p.surface)),
        border: Border {
            color: p.border,
            width: 1.0,
            radius: radius::NONE.into(),
        },
        ..Default::default()
    }
}

/// Main content area.
pub fn content_style(_theme: &iced::Theme) -> container::Style {
    let p = palette::current();

    container::Style {
        background: Some(Background::Color(p.background)),
        text_color: Some(p.text_primary),
        ..Default::default()
    }
}

/// Message bubble; user messages are tinted.
pub fn bubble_style(from_user: bool) -> impl Fn(&iced::Theme) -> container::Style {
    move |_theme| {
        let p = palette::current();

        container::Style {
            background: Some(Background::Color(if from_user {
                p.user_bubble
            } else {
                p.surface
            })),
            border: Border {
                color: p.border,
                width: 1.0,
                radius: radius::LARGE.into(),
            },
            shadow: shadows::subtle(),
            ..Default::default()
        }
    }
}

/// Fenced code and display math.
pub fn code_block_style(_theme: &iced::Theme) -> container::Style {
    let p = palette::current();

    container::Style {
        background: Some(Background::Color(p.code_background)),
        border: Border {
            color: p.border,
            width: 1.0,
            radius: radius::SMALL.into(),
        },
        ..Default::default()
    }
}

/// Block quote bar.
pub fn quote_style(_theme: &iced::Theme) -> container::Style {
    let p = palette::current();

    container::Style {
        text_color: Some(p.text_secondary),
        border: Border {
            color: p.border_strong,
            width: 1.0,
            radius: radius::NONE.into(),
        },
        ..Default::default()
    }
}

/// Frame around an image that is loading or failed.
pub fn image_placeholder_style(_theme: &iced::Theme) -> container::Style {
    let p = palette::current();

    container::Style {
        background: Some(Background::Color(p.surface_raised)),
        text_color: Some(p.text_muted),
        border: Border {
            color: p.border,
            width: 1.0,
            radius: radius::MEDIUM.into(),
        },
        ..Default::default()
    }
}

/// Backdrop of the image preview.
pub fn viewer_backdrop_style(_theme: &iced::Theme) -> container::Style {
    let p = palette::current();

    container::Style {
        background: Some(Background::Color(p.overlay)),
        text_color: Some(Color::WHITE),
        ..Default::default()
    }
}

/// Floating toolbar of the image preview.
pub fn viewer_toolbar_style(_theme: &iced::Theme) -> container::Style {
    container::Style {
        background: Some(Background::Color(Color::from_rgba(0.0, 0.0, 0.0, 0.55))),
        text_color: Some(Color::WHITE),
        border: Border {
            color: Color::from_rgba(1.0, 1.0, 1.0, 0.12),
            width: 1.0,
            radius: radius::PILL.into(),
        },
        shadow: shadows::floating(),
        ..Default::default()
    }
}

/// Toast notification.
pub fn toast_style(kind: ToastKind) -> impl Fn(&iced::Theme) -> container::Style {
    move |_theme| {
        let p = palette::current();
        let accent = match kind {
            ToastKind::Success => p.success,
            ToastKind::Error => p.danger,
        };

        container::Style {
            background: Some(Background::Color(p.surface_raised)),
            text_color: Some(p.text_primary),
            border: Border {
                color: accent,
                width: 1.0,
                radius: radius::MEDIUM.into(),
            },
            shadow: shadows::floating(),
            ..Default::default()
        }
    }
}

/// Settings card.
pub fn card_style(_theme: &iced::Theme) -> container::Style {
    let p = palette::current();

    container::Style {
        background: Some(Background::Color(p.surface)),
        border: Border {
            color: p.border,
            width: 1.0,
            radius: radius::MEDIUM.into(),
        },
        ..Default::default()
    }
}
