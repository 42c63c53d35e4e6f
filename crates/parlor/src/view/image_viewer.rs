//! Full-window image preview with its toolbar.

use iced::widget::{Space, button, column, container, image, opaque, row, scrollable, text};
use iced::{Alignment, ContentFit, Element, Length};

use crate::message::{ImageAction, Message, ViewerMessage};
use crate::model::ViewerState;
use crate::style::widgets::{viewer_backdrop_style, viewer_button_style, viewer_toolbar_style};

/// Renders the preview overlay.
pub fn view_image_viewer(state: &ViewerState) -> Element<'static, Message> {
    let body: Element<'static, Message> = if let Some(error) = &state.error {
        text(format!("Cannot show image: {error}")).size(14).into()
    } else if let Some(rendered) = &state.rendered {
        let (width, height) = state.transform.display_size(rendered.width, rendered.height);
        let picture = image(rendered.handle.clone())
            .width(Length::Fixed(width))
            .height(Length::Fixed(height))
            .content_fit(ContentFit::Fill);

        scrollable(container(picture).center(Length::Shrink))
            .direction(scrollable::Direction::Both {
                vertical: scrollable::Scrollbar::default(),
                horizontal: scrollable::Scrollbar::default(),
            })
            .into()
    } else {
        text("Loading\u{2026}").size(14).into()
    };

    let close = row![
        Space::new().width(Length::Fill),
        tool("\u{2715}", "Close", Some(ViewerMessage::Close.into())),
    ]
    .padding(12);

    let stage = container(body)
        .center_x(Length::Fill)
        .center_y(Length::Fill);

    let toolbar = container(view_toolbar(state))
        .padding([6, 14])
        .style(viewer_toolbar_style);

    let layout = column![
        close,
        stage,
        container(toolbar).center_x(Length::Fill).padding(20),
    ];

    opaque(
        container(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .style(viewer_backdrop_style),
    )
}

fn view_toolbar(state: &ViewerState) -> Element<'static, Message> {
    let transform = &state.transform;
    let ready = state.payload.is_some();
    let on_image = |action: ImageAction| {
        ready.then(|| Message::ImageAction(action, state.image.clone()))
    };

    row![
        tool("\u{21C5}", "Flip vertical", Some(ViewerMessage::FlipVertical.into())),
        tool("\u{21C4}", "Flip horizontal", Some(ViewerMessage::FlipHorizontal.into())),
        tool("\u{27F2}", "Rotate left", Some(ViewerMessage::RotateLeft.into())),
        tool("\u{27F3}", "Rotate right", Some(ViewerMessage::RotateRight.into())),
        tool(
            "\u{2212}",
            "Zoom out",
            transform.can_zoom_out().then_some(ViewerMessage::ZoomOut.into()),
        ),
        tool(
            "+",
            "Zoom in",
            transform.can_zoom_in().then_some(ViewerMessage::ZoomIn.into()),
        ),
        tool("\u{21BA}", "Reset", Some(ViewerMessage::Reset.into())),
        tool("\u{2398}", "Copy", on_image(ImageAction::CopyImage)),
        tool("\u{2913}", "Download", on_image(ImageAction::Download)),
    ]
    .spacing(4)
    .align_y(Alignment::Center)
    .into()
}

fn tool(
    glyph: &'static str,
    label: &'static str,
    on_press: Option<Message>,
) -> Element<'static, Message> {
    button(
        column![text(glyph).size(18), text(label).size(10)]
            .align_x(Alignment::Center)
            .spacing(2),
    )
    .padding([6, 10])
    .style(viewer_button_style)
    .on_press_maybe(on_press)
    .into()
}
