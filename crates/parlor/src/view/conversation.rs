//! Conversation view: message bubbles and the image URL composer.

use iced::widget::{Column, Space, button, column, container, row, scrollable, text, text_input};
use iced::{Alignment, Element, Length};
use parlor_core::{BlockContent, BlockStatus, MessageBlock, MessageRole};

use super::image_block::view_image_block;
use super::markdown::view_markdown;
use crate::message::Message;
use crate::model::{ConversationEntry, ConversationState, ImageCache};
use crate::style::widgets::{
    bubble_style, content_style, ghost_button_style, palette, primary_button_style,
    scrollable_style, text_input_style,
};

/// Renders the open topic.
pub fn view_conversation(
    state: Option<&ConversationState>,
    cache: &ImageCache,
    image_url: &str,
    error: Option<&str>,
) -> Element<'static, Message> {
    let p = palette::current();

    let Some(state) = state else {
        return container(text("Select a topic").size(16).color(p.text_muted))
            .center(Length::Fill)
            .style(content_style)
            .into();
    };

    let header = row![
        text(state.topic_id().as_str().to_string())
            .size(18)
            .font(iced::Font {
                weight: iced::font::Weight::Semibold,
                ..Default::default()
            }),
        Space::new().width(Length::Fill),
        button(text("Reload").size(13))
            .padding([6, 12])
            .style(ghost_button_style)
            .on_press(Message::Refresh),
    ]
    .align_y(Alignment::Center)
    .padding([12, 20]);

    let bubbles: Vec<Element<'static, Message>> = state
        .entries()
        .iter()
        .map(|entry| view_entry(entry, state, cache))
        .collect();

    let list = scrollable(Column::with_children(bubbles).spacing(14).padding(20))
        .height(Length::Fill)
        .style(scrollable_style);

    let mut layout = column![header, list];

    if let Some(error) = error {
        layout = layout.push(
            container(text(error.to_string()).size(13).color(p.danger)).padding([4, 20]),
        );
    }

    layout = layout.push(view_composer(image_url));

    container(layout)
        .width(Length::Fill)
        .height(Length::Fill)
        .style(content_style)
        .into()
}

fn view_entry(
    entry: &ConversationEntry,
    state: &ConversationState,
    cache: &ImageCache,
) -> Element<'static, Message> {
    let p = palette::current();
    let from_user = entry.message.role == MessageRole::User;

    let role = match entry.message.role {
        MessageRole::User => "You",
        MessageRole::Assistant => "Assistant",
        MessageRole::System => "System",
    };
    let stamp = entry
        .message
        .created_at
        .with_timezone(&chrono::Local)
        .format("%H:%M")
        .to_string();

    let mut body = column![
        row![
            text(role).size(12).color(p.text_secondary),
            text(stamp).size(11).color(p.text_muted),
        ]
        .spacing(8)
    ]
    .spacing(8);

    for block in &entry.blocks {
        body = body.push(view_block(block, state, cache));
    }

    let bubble = container(body)
        .padding([12, 16])
        .max_width(760.0)
        .style(bubble_style(from_user));

    let aligned = container(bubble).width(Length::Fill);
    if from_user {
        aligned.align_right(Length::Fill).into()
    } else {
        aligned.into()
    }
}

fn view_block(
    block: &MessageBlock,
    state: &ConversationState,
    cache: &ImageCache,
) -> Element<'static, Message> {
    let p = palette::current();

    let body: Element<'static, Message> = match &block.content {
        BlockContent::Image { .. } => state
            .image_view(&block.id)
            .map_or_else(|| Space::new().into(), |view| view_image_block(view, cache)),
        _ => state.text_view(&block.id).map_or_else(
            || Space::new().into(),
            |view| view_markdown(view, cache),
        ),
    };

    let label = match &block.content {
        BlockContent::Thinking { thinking_millis, .. } => Some(format!(
            "Thought for {:.1}s",
            std::time::Duration::from_millis(*thinking_millis).as_secs_f64()
        )),
        BlockContent::Translation {
            target_language, ..
        } => Some(format!("Translation ({target_language})")),
        _ => None,
    };

    let mut content = column![].spacing(4);
    if let Some(label) = label {
        content = content.push(text(label).size(12).color(p.text_muted));
    }
    content = content.push(body);
    if block.status == BlockStatus::Error {
        content = content.push(text("This block failed.").size(12).color(p.danger));
    }
    content.into()
}

fn view_composer(image_url: &str) -> Element<'static, Message> {
    let input = text_input("Paste an image URL\u{2026}", image_url)
        .on_input(Message::ImageUrlChanged)
        .on_submit(Message::AddImage)
        .padding(10)
        .size(14)
        .style(text_input_style);

    let add = button(text("Add image").size(14))
        .padding([10, 16])
        .style(primary_button_style)
        .on_press_maybe((!image_url.trim().is_empty()).then_some(Message::AddImage));

    row![input, add]
        .spacing(8)
        .padding([12, 20])
        .align_y(Alignment::Center)
        .into()
}
