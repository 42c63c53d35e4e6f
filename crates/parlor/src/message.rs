//! Application messages for the Elm architecture.

use std::sync::Arc;
use std::time::Instant;

use iced::widget::image;
use parlor_core::{BlockId, DisplayImage, ImagePayload, LocalizeOutcome, MathEngine, TopicId};

use crate::Services;
use crate::model::{AppSettings, Conversation, RenderedImage, SettingsSection};

/// Application messages.
#[derive(Debug, Clone)]
pub enum Message {
    /// Switch screens.
    NavigateTo(View),
    /// Stores opened.
    ServicesReady(Result<Arc<Services>, String>),

    /// Topic list loaded.
    TopicsLoaded(Result<Vec<TopicId>, String>),
    /// Open a topic.
    SelectTopic(TopicId),
    /// Topic contents loaded.
    ConversationLoaded(Result<Conversation, String>),
    /// Reload the open topic.
    Refresh,

    /// Image URL input changed.
    ImageUrlChanged(String),
    /// Post the typed URL as an image message.
    AddImage,
    /// Image message stored.
    ImageAdded(Result<(), String>),

    /// Display image decoded, keyed by its source.
    ImageLoaded(String, Result<image::Handle, String>),
    /// A background localization finished.
    LocalizeFinished(BlockId, LocalizeOutcome),
    /// Localized reference written back; true if the block changed.
    LocalizationApplied(Result<bool, String>),

    /// Open the image preview.
    OpenViewer(DisplayImage),
    /// Image preview messages.
    Viewer(ViewerMessage),
    /// Run an action on an image.
    ImageAction(ImageAction, DisplayImage),
    /// An image action finished with a success or failure text.
    ActionFinished(Result<String, String>),
    /// Open a Markdown link in the browser.
    OpenLink(String),

    /// Settings messages.
    Settings(SettingsMessage),
    /// Settings loaded from disk.
    SettingsLoaded(Result<AppSettings, String>),
    /// Settings written to disk.
    SettingsSaved(Result<(), String>),

    /// Close a toast.
    DismissToast(u64),
    /// Periodic tick for toast expiry.
    Tick(Instant),
    /// Keyboard shortcut.
    KeyPressed(KeyboardAction),
    /// Event with nothing to do.
    Ignored,
}

impl From<ViewerMessage> for Message {
    fn from(message: ViewerMessage) -> Self {
        Self::Viewer(message)
    }
}

/// Actions offered on an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAction {
    /// Copy the image source text.
    CopyUrl,
    /// Save the image to the downloads directory.
    Download,
    /// Copy the decoded image to the clipboard.
    CopyImage,
}

/// Image preview messages.
#[derive(Debug, Clone)]
pub enum ViewerMessage {
    /// Mirror top to bottom.
    FlipVertical,
    /// Mirror left to right.
    FlipHorizontal,
    /// Quarter turn counter-clockwise.
    RotateLeft,
    /// Quarter turn clockwise.
    RotateRight,
    /// Zoom out one step.
    ZoomOut,
    /// Zoom in one step.
    ZoomIn,
    /// Restore orientation and size.
    Reset,
    /// Close the preview.
    Close,
    /// Original bytes loaded.
    PayloadLoaded(Result<Arc<ImagePayload>, String>),
    /// Oriented pixels ready.
    Rendered(Result<RenderedImage, String>),
}

/// Settings screen messages.
#[derive(Debug, Clone)]
pub enum SettingsMessage {
    /// Select a settings section.
    SelectSection(SettingsSection),
    /// Toggle between light and dark.
    ToggleTheme,
    /// Toggle automatic image localization.
    ToggleAutoLocalize(bool),
    /// Choose the math engine.
    SelectMathEngine(MathEngine),
    /// Toggle `$...$` inline math.
    ToggleSingleDollar(bool),
}

/// Keyboard shortcut actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardAction {
    /// Escape: close the preview or leave settings.
    Cancel,
    /// Ctrl+,: settings.
    Settings,
    /// F5: reload the topic.
    Refresh,
    /// Plus: zoom the preview in.
    ZoomIn,
    /// Minus: zoom the preview out.
    ZoomOut,
    /// Zero: reset the preview.
    ResetView,
}

/// Application screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Topic list and conversation.
    #[default]
    Conversation,
    /// Settings screen.
    Settings,
}
