//! Data models for the chat client.

mod conversation;
mod image_cache;
mod settings;
mod toast;
mod viewer;

pub use conversation::{
    Conversation, ConversationEntry, ConversationState, PAUSED_LABEL, PresentedWork, TextView,
};
pub use image_cache::{ImageCache, ImageState};
pub use settings::{AppSettings, SettingsSection, SettingsState};
pub use toast::{Toast, ToastKind, Toasts};
pub use viewer::{RenderedImage, ViewerState, ViewerTransform};
