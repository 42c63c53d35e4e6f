//! Settings view.

use iced::widget::{Space, button, column, container, pick_list, row, scrollable, text, toggler};
use iced::{Alignment, Element, Length};
use parlor_core::MathEngine;

use crate::message::{Message, SettingsMessage, View};
use crate::model::{AppSettings, SettingsSection, SettingsState};
use crate::style::widgets::palette::{self, ThemeMode};
use crate::style::widgets::{
    card_style, content_style, ghost_button_style, nav_button_style, scrollable_style,
};

const MATH_ENGINES: [&str; 3] = ["KaTeX", "MathJax", "None"];

/// Renders the settings view.
pub fn view_settings(state: &SettingsState, settings: &AppSettings) -> Element<'static, Message> {
    let p = palette::current();

    let title = text("Settings").size(28).color(p.text_primary);

    let tabs = row![
        section_tab("Images", SettingsSection::Images, state.selected_section),
        section_tab("Markdown", SettingsSection::Markdown, state.selected_section),
        section_tab(
            "Appearance",
            SettingsSection::Appearance,
            state.selected_section
        ),
        section_tab("About", SettingsSection::About, state.selected_section),
    ]
    .spacing(4);

    let content: Element<'static, Message> = match state.selected_section {
        SettingsSection::Images => view_images_section(settings),
        SettingsSection::Markdown => view_markdown_section(settings),
        SettingsSection::Appearance => view_appearance_section(settings.theme_mode),
        SettingsSection::About => view_about_section(),
    };

    let back_btn = button(text("Back to conversation").size(14))
        .padding([10, 20])
        .style(ghost_button_style)
        .on_press(Message::NavigateTo(View::Conversation));

    let layout = column![
        title,
        Space::new().height(Length::Fixed(16.0)),
        tabs,
        Space::new().height(Length::Fixed(20.0)),
        container(content).padding(20).width(Length::Fill).style(card_style),
        Space::new().height(Length::Fixed(20.0)),
        back_btn,
    ]
    .spacing(8)
    .padding(24)
    .max_width(760.0);

    container(scrollable(layout).height(Length::Fill).style(scrollable_style))
        .width(Length::Fill)
        .height(Length::Fill)
        .style(content_style)
        .into()
}

fn section_tab(
    label: &'static str,
    section: SettingsSection,
    current: SettingsSection,
) -> Element<'static, Message> {
    button(text(label).size(14))
        .padding([8, 16])
        .style(nav_button_style(section == current))
        .on_press(Message::Settings(SettingsMessage::SelectSection(section)))
        .into()
}

fn view_images_section(settings: &AppSettings) -> Element<'static, Message> {
    let p = palette::current();
    let auto = settings.core.auto_localize_images;

    column![
        text("Images").size(20).color(p.text_primary),
        Space::new().height(Length::Fixed(12.0)),
        setting_row(
            "Save generated images",
            toggler(auto)
                .on_toggle(|on| Message::Settings(SettingsMessage::ToggleAutoLocalize(on)))
                .width(Length::Shrink)
                .into(),
        ),
        text(if auto {
            "Remote images in image blocks are downloaded once and kept locally."
        } else {
            "Remote images are always loaded from their original address."
        })
        .size(12)
        .color(p.text_muted),
        Space::new().height(Length::Fixed(12.0)),
        setting_row(
            "Storage folder",
            text(settings.core.files_path.display().to_string())
                .size(13)
                .color(p.text_secondary)
                .into(),
        ),
    ]
    .spacing(6)
    .into()
}

fn view_markdown_section(settings: &AppSettings) -> Element<'static, Message> {
    let p = palette::current();
    let engine = settings.core.math_engine;

    let single_dollar = toggler(settings.core.math_enable_single_dollar)
        .on_toggle_maybe(
            engine
                .is_enabled()
                .then_some(|on| Message::Settings(SettingsMessage::ToggleSingleDollar(on))),
        )
        .width(Length::Shrink);

    column![
        text("Markdown").size(20).color(p.text_primary),
        Space::new().height(Length::Fixed(12.0)),
        setting_row(
            "Math engine",
            pick_list(MATH_ENGINES, Some(engine_label(engine)), |label| {
                Message::Settings(SettingsMessage::SelectMathEngine(engine_from_label(label)))
            })
            .padding(8)
            .into(),
        ),
        setting_row("Single $ for inline math", single_dollar.into()),
        text("Turn this off if prices like $5 render as formulas.")
            .size(12)
            .color(p.text_muted),
    ]
    .spacing(6)
    .into()
}

fn view_appearance_section(theme_mode: ThemeMode) -> Element<'static, Message> {
    let p = palette::current();
    let is_dark = theme_mode == ThemeMode::Dark;

    column![
        text("Appearance").size(20).color(p.text_primary),
        Space::new().height(Length::Fixed(12.0)),
        setting_row(
            "Theme",
            toggler(is_dark)
                .label(if is_dark { "Dark Mode" } else { "Light Mode" })
                .on_toggle(|_| Message::Settings(SettingsMessage::ToggleTheme))
                .text_size(14)
                .width(Length::Shrink)
                .into(),
        ),
    ]
    .spacing(6)
    .into()
}

fn view_about_section() -> Element<'static, Message> {
    let p = palette::current();

    column![
        text("About Parlor").size(20).color(p.text_primary),
        Space::new().height(Length::Fixed(12.0)),
        text(concat!("Version ", env!("CARGO_PKG_VERSION")))
            .size(14)
            .color(p.text_secondary),
        text("A desktop chat client with Markdown rendering and local image storage.")
            .size(14)
            .color(p.text_secondary),
        Space::new().height(Length::Fixed(12.0)),
        text("Built with iced GUI framework")
            .size(12)
            .color(p.text_muted),
    ]
    .spacing(4)
    .into()
}

fn setting_row(
    label: &'static str,
    control: Element<'static, Message>,
) -> Element<'static, Message> {
    row![
        text(label)
            .size(14)
            .color(palette::current().text_secondary)
            .width(Length::Fixed(200.0)),
        control,
    ]
    .spacing(16)
    .align_y(Alignment::Center)
    .into()
}

const fn engine_label(engine: MathEngine) -> &'static str {
    match engine {
        MathEngine::KaTeX => "KaTeX",
        MathEngine::MathJax => "MathJax",
        MathEngine::None => "None",
    }
}

fn engine_from_label(label: &str) -> MathEngine {
    match label {
        "MathJax" => MathEngine::MathJax,
        "None" => MathEngine::None,
        _ => MathEngine::KaTeX,
    }
}
