//! Widget styles with rounded corners and theme-aware colors.

mod buttons;
mod containers;
mod inputs;
pub mod palette;
mod shadows;

pub use shadows::radius;

pub use containers::{
    bubble_style, card_style, code_block_style, content_style, image_placeholder_style,
    quote_style, sidebar_style, toast_style, viewer_backdrop_style, viewer_toolbar_style,
};

pub use buttons::{
    ghost_button_style, link_button_style, nav_button_style, primary_button_style,
    viewer_button_style,
};

pub use inputs::{scrollable_style, text_input_style};
