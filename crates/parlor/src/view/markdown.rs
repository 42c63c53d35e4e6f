//! Markdown rendering for text blocks.

use iced::widget::text::Span;
use iced::widget::{Column, Row, Space, column, container, rich_text, row, span, text};
use iced::{Element, Font, Length};
use parlor_core::markdown::{Inline, ListMarker, Node};

use super::image_block::view_image;
use crate::message::Message;
use crate::model::{ImageCache, TextView};
use crate::style::widgets::{code_block_style, palette, quote_style};

/// Width of images embedded in Markdown.
const INLINE_IMAGE_WIDTH: f32 = 360.0;

/// Renders a parsed text block.
pub fn view_markdown(view: &TextView, cache: &ImageCache) -> Element<'static, Message> {
    if view.is_placeholder {
        return text(view.document.plain_text())
            .size(14)
            .color(palette::current().text_muted)
            .into();
    }

    let nodes: Vec<Element<'static, Message>> = view
        .document
        .nodes()
        .iter()
        .map(|node| view_node(node, view, cache))
        .collect();

    Column::with_children(nodes).spacing(10).into()
}

fn view_node(node: &Node, view: &TextView, cache: &ImageCache) -> Element<'static, Message> {
    let p = palette::current();

    match node {
        Node::Heading { level, spans } => {
            let size = match level {
                1 => 24.0,
                2 => 20.0,
                3 => 18.0,
                _ => 16.0,
            };
            let bold = SpanStyleOverride {
                size: Some(size),
                bold: true,
            };
            paragraph(spans, bold)
        }
        Node::Paragraph(spans) => paragraph(spans, SpanStyleOverride::default()),
        Node::CodeBlock { language, code } => {
            let mut body = column![];
            if let Some(language) = language {
                body = body.push(text(language.clone()).size(11).color(p.text_muted));
            }
            body = body.push(
                text(code.trim_end().to_string())
                    .size(13)
                    .font(Font::MONOSPACE),
            );

            container(body.spacing(4))
                .width(Length::Fill)
                .padding(10)
                .style(code_block_style)
                .into()
        }
        Node::Quote(children) => {
            let children: Vec<Element<'static, Message>> = children
                .iter()
                .map(|child| view_node(child, view, cache))
                .collect();

            container(Column::with_children(children).spacing(6))
                .padding([4, 12])
                .style(quote_style)
                .into()
        }
        Node::ListItem {
            depth,
            marker,
            checked,
            spans,
        } => {
            let bullet = match (checked, marker) {
                (Some(true), _) => "\u{2611}".to_string(),
                (Some(false), _) => "\u{2610}".to_string(),
                (None, ListMarker::Bullet) => "\u{2022}".to_string(),
                (None, ListMarker::Ordered(n)) => format!("{n}."),
            };
            #[allow(clippy::cast_precision_loss)]
            let indent = (*depth as f32) * 18.0;

            row![
                Space::new().width(Length::Fixed(indent)),
                text(bullet).size(14).width(Length::Fixed(22.0)),
                paragraph(spans, SpanStyleOverride::default()),
            ]
            .into()
        }
        Node::Table { header, rows } => {
            let bold = SpanStyleOverride {
                size: None,
                bold: true,
            };
            let mut table = column![table_row(header, bold)];
            for cells in rows {
                table = table.push(table_row(cells, SpanStyleOverride::default()));
            }

            container(table.spacing(4))
                .padding(8)
                .style(code_block_style)
                .into()
        }
        Node::Math(source) => container(
            text(source.clone())
                .size(14)
                .font(Font {
                    style: iced::font::Style::Italic,
                    ..Font::MONOSPACE
                }),
        )
        .center_x(Length::Fill)
        .padding(8)
        .into(),
        Node::Image { src, alt } => view.images.get(src).map_or_else(
            || text(alt.clone()).size(13).color(p.text_muted).into(),
            |display| view_image(display, cache, INLINE_IMAGE_WIDTH),
        ),
        Node::Html(content) => text(content.clone())
            .size(14)
            .color(p.text_secondary)
            .into(),
        Node::Rule => container(Space::new())
            .width(Length::Fill)
            .height(Length::Fixed(1.0))
            .style(|_theme| container::Style {
                background: Some(iced::Background::Color(palette::current().border)),
                ..Default::default()
            })
            .into(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SpanStyleOverride {
    size: Option<f32>,
    bold: bool,
}

fn table_row(cells: &[Vec<Inline>], style: SpanStyleOverride) -> Element<'static, Message> {
    let cells: Vec<Element<'static, Message>> = cells
        .iter()
        .map(|cell| {
            container(paragraph(cell, style))
                .width(Length::FillPortion(1))
                .into()
        })
        .collect();

    Row::with_children(cells).spacing(12).into()
}

fn paragraph(inlines: &[Inline], base: SpanStyleOverride) -> Element<'static, Message> {
    let spans: Vec<Span<'static, String>> = inlines
        .iter()
        .map(|inline| to_span(inline, base))
        .collect();

    rich_text(spans)
        .size(base.size.unwrap_or(14.0))
        .on_link_click(Message::OpenLink)
        .into()
}

fn to_span(inline: &Inline, base: SpanStyleOverride) -> Span<'static, String> {
    let p = palette::current();

    match inline {
        Inline::Text { text, style, link } => {
            let font = Font {
                weight: if style.strong || base.bold {
                    iced::font::Weight::Bold
                } else {
                    iced::font::Weight::Normal
                },
                style: if style.emphasis {
                    iced::font::Style::Italic
                } else {
                    iced::font::Style::Normal
                },
                ..Font::default()
            };

            let mut styled = span(text.clone())
                .font(font)
                .strikethrough(style.strikethrough);
            if let Some(size) = base.size {
                styled = styled.size(size);
            }
            match link {
                Some(target) => styled.color(p.link).underline(true).link(target.clone()),
                None => styled,
            }
        }
        Inline::Code(code) => span(code.clone())
            .font(Font::MONOSPACE)
            .color(p.text_secondary),
        Inline::Math(source) => span(source.clone()).font(Font {
            style: iced::font::Style::Italic,
            ..Font::MONOSPACE
        }),
        Inline::Break => span("\n"),
    }
}
