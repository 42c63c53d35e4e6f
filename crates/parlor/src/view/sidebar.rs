//! Sidebar view component (topic list).

use iced::widget::{Column, Space, button, column, container, scrollable, text};
use iced::{Element, Length};
use parlor_core::TopicId;

use crate::message::{Message, View};
use crate::style::widgets::{
    ghost_button_style, nav_button_style, palette, scrollable_style, sidebar_style,
};

/// Renders the sidebar with the topic list and a settings entry.
pub fn view_sidebar(topics: &[TopicId], selected: Option<&TopicId>) -> Element<'static, Message> {
    let header = container(
        text("TOPICS")
            .size(11)
            .font(iced::Font {
                weight: iced::font::Weight::Bold,
                ..Default::default()
            })
            .style(|_theme| text::Style {
                color: Some(palette::current().text_muted),
            }),
    )
    .padding([12, 16]);

    let items: Vec<Element<'static, Message>> = if topics.is_empty() {
        vec![
            container(text("No topics yet").size(13).color(palette::current().text_muted))
                .padding([4, 16])
                .into(),
        ]
    } else {
        topics
            .iter()
            .map(|topic| view_topic_item(topic, selected == Some(topic)))
            .collect()
    };

    let list = Column::with_children(items).spacing(2).padding([0, 8]);

    let settings_btn = button(text("\u{2699}  Settings").size(14))
        .width(Length::Fill)
        .padding([8, 12])
        .style(ghost_button_style)
        .on_press(Message::NavigateTo(View::Settings));

    let content = column![
        header,
        scrollable(list).height(Length::Fill).style(scrollable_style),
        Space::new().height(8),
        container(settings_btn).padding([8, 8]),
    ];

    container(content)
        .width(Length::Fixed(220.0))
        .height(Length::Fill)
        .style(sidebar_style)
        .into()
}

fn view_topic_item(topic: &TopicId, is_selected: bool) -> Element<'static, Message> {
    let label = text(topic.as_str().to_string())
        .size(14)
        .font(iced::Font {
            weight: if is_selected {
                iced::font::Weight::Semibold
            } else {
                iced::font::Weight::Normal
            },
            ..Default::default()
        });

    button(label)
        .width(Length::Fill)
        .padding([8, 12])
        .style(nav_button_style(is_selected))
        .on_press(Message::SelectTopic(topic.clone()))
        .into()
}
