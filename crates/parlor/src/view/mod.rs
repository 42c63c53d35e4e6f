//! View components for the application.

mod conversation;
mod image_block;
mod image_viewer;
mod markdown;
mod settings;
mod sidebar;
mod toast;

pub use conversation::view_conversation;
pub use image_viewer::view_image_viewer;
pub use settings::view_settings;
pub use sidebar::view_sidebar;
pub use toast::view_toasts;
