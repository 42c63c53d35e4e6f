//! Thumbnails of image blocks and Markdown images.

use iced::widget::{Row, Space, button, column, container, image, row, text};
use iced::{ContentFit, Element, Length};
use parlor_core::{DisplayImage, ImageBlockView};

use crate::message::{ImageAction, Message};
use crate::model::{ImageCache, ImageState};
use crate::style::widgets::{ghost_button_style, image_placeholder_style, palette};

/// Width of a lone image.
const SINGLE_WIDTH: f32 = 420.0;
/// Width of each image in a multi-image block.
const GRID_WIDTH: f32 = 240.0;

/// Renders an image block.
pub fn view_image_block(view: &ImageBlockView, cache: &ImageCache) -> Element<'static, Message> {
    match view {
        ImageBlockView::Placeholder => placeholder("Generating image\u{2026}", SINGLE_WIDTH),
        ImageBlockView::Hidden => Space::new().width(0).height(0).into(),
        ImageBlockView::Images(images) => {
            let width = if images.len() > 1 {
                GRID_WIDTH
            } else {
                SINGLE_WIDTH
            };
            let thumbs: Vec<Element<'static, Message>> = images
                .iter()
                .map(|image| view_image(image, cache, width))
                .collect();

            Row::with_children(thumbs).spacing(8).wrap().into()
        }
    }
}

/// Renders one clickable image with its actions underneath.
pub fn view_image(
    display: &DisplayImage,
    cache: &ImageCache,
    max_width: f32,
) -> Element<'static, Message> {
    let key = display.source.to_string();

    let body: Element<'static, Message> = match cache.get(&key) {
        Some(ImageState::Ready(handle)) => button(
            image(handle.clone())
                .width(Length::Fixed(max_width))
                .content_fit(ContentFit::Contain),
        )
        .padding(0)
        .style(ghost_button_style)
        .on_press(Message::OpenViewer(display.clone()))
        .into(),
        Some(ImageState::Failed(_)) => placeholder("Image unavailable", max_width),
        Some(ImageState::Loading) | None => placeholder("Loading\u{2026}", max_width),
    };

    let actions = row![
        action_button("Copy URL", ImageAction::CopyUrl, display),
        action_button("Download", ImageAction::Download, display),
        action_button("Copy image", ImageAction::CopyImage, display),
    ]
    .spacing(4);

    column![body, actions].spacing(4).into()
}

fn action_button(
    label: &'static str,
    action: ImageAction,
    display: &DisplayImage,
) -> Element<'static, Message> {
    button(text(label).size(12).color(palette::current().text_secondary))
        .padding([2, 8])
        .style(ghost_button_style)
        .on_press(Message::ImageAction(action, display.clone()))
        .into()
}

fn placeholder(label: &'static str, width: f32) -> Element<'static, Message> {
    container(text(label).size(13))
        .center_x(Length::Fixed(width))
        .center_y(Length::Fixed(width * 0.6))
        .style(image_placeholder_style)
        .into()
}
