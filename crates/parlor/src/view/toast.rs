//! Toast notifications in the bottom-right corner.

use iced::widget::{Column, button, container, row, text};
use iced::{Alignment, Element, Length};

use crate::message::Message;
use crate::model::{ToastKind, Toasts};
use crate::style::widgets::{ghost_button_style, palette, toast_style};

/// Renders visible toasts.
pub fn view_toasts(toasts: &Toasts) -> Element<'static, Message> {
    let items: Vec<Element<'static, Message>> = toasts
        .items()
        .iter()
        .map(|toast| {
            let p = palette::current();
            let icon = match toast.kind {
                ToastKind::Success => text("\u{2713}").color(p.success),
                ToastKind::Error => text("\u{26A0}").color(p.danger),
            };

            container(
                row![
                    icon.size(14),
                    text(toast.text.clone()).size(13),
                    button(text("\u{2715}").size(11))
                        .padding([2, 6])
                        .style(ghost_button_style)
                        .on_press(Message::DismissToast(toast.id)),
                ]
                .spacing(10)
                .align_y(Alignment::Center),
            )
            .padding([8, 12])
            .style(toast_style(toast.kind))
            .into()
        })
        .collect();

    container(Column::with_children(items).spacing(8).align_x(Alignment::End))
        .align_right(Length::Fill)
        .align_bottom(Length::Fill)
        .padding(20)
        .into()
}
