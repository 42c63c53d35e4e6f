//! `Parlor` - desktop chat client
//!
//! Renders conversations as Markdown and keeps generated images in local
//! storage. Built with Rust and the iced GUI framework.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod message;
mod model;
mod style;
mod view;

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use iced::keyboard::{self, Key, Modifiers};
use iced::widget::{image, row, stack};
use iced::{Element, Length, Subscription, Task};
use parlor_core::{
    BlockId, BlockStatus, DisplayImage, FileStore, HttpDownloader, ImagePayload,
    LocalizeContext, LocalizeOutcome, Localized, Message as ChatMessage, MessageBlock,
    MessageRole, MessageStore, TopicId, apply_localization, load_image, save_to_directory,
};
use parlor_media::ImageRef;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use message::{ImageAction, KeyboardAction, Message, SettingsMessage, View, ViewerMessage};
use model::{
    AppSettings, Conversation, ConversationEntry, ConversationState, ImageCache, PresentedWork,
    RenderedImage, SettingsState, Toasts, ViewerState, ViewerTransform,
};
use style::widgets::palette::{self, ThemeMode};

/// Timeout for image requests made for display.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Topic created on first start.
const WELCOME_TOPIC: &str = "welcome";
/// How often visible toasts are checked for expiry.
const TOAST_TICK: Duration = Duration::from_millis(500);

fn main() -> iced::Result {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parlor=debug,parlor_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Parlor");

    iced::application(Parlor::new, Parlor::update, Parlor::view)
        .title("Parlor")
        .subscription(Parlor::subscription)
        .theme(Parlor::theme)
        .run()
}

/// Stores and clients shared by background tasks.
pub struct Services {
    store: MessageStore,
    localize: Arc<LocalizeContext<HttpDownloader>>,
    http: reqwest::Client,
    storage_root: PathBuf,
    clipboard: Mutex<Option<arboard::Clipboard>>,
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("storage_root", &self.storage_root)
            .finish_non_exhaustive()
    }
}

/// Main application state.
struct Parlor {
    /// Current view/screen.
    current_view: View,
    /// Persisted settings.
    settings: AppSettings,
    /// Settings screen state.
    settings_state: SettingsState,
    /// Opened stores, once ready.
    services: Option<Arc<Services>>,
    /// Known topics.
    topics: Vec<TopicId>,
    /// Topic the user selected.
    selected_topic: Option<TopicId>,
    /// Presentation of the open topic.
    conversation: Option<ConversationState>,
    /// Decoded display images.
    images: ImageCache,
    /// Open image preview.
    viewer: Option<ViewerState>,
    /// Image URL being typed.
    image_url: String,
    /// Notifications.
    toasts: Toasts,
    /// Error message to display.
    error_message: Option<String>,
}

impl Default for Parlor {
    fn default() -> Self {
        Self {
            current_view: View::Conversation,
            settings: AppSettings::default(),
            settings_state: SettingsState::new(),
            services: None,
            topics: Vec::new(),
            selected_topic: None,
            conversation: None,
            images: ImageCache::default(),
            viewer: None,
            image_url: String::new(),
            toasts: Toasts::default(),
            error_message: None,
        }
    }
}

impl Parlor {
    /// Create new application instance.
    fn new() -> (Self, Task<Message>) {
        let app = Self::default();
        palette::set_theme(app.settings.theme_mode);
        (app, Task::perform(load_settings(), Message::SettingsLoaded))
    }

    /// Update state based on message.
    #[allow(clippy::needless_pass_by_value)]
    #[allow(clippy::too_many_lines)] // Large match is idiomatic for Elm architecture
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::NavigateTo(view) => {
                self.current_view = view;
            }
            Message::SettingsLoaded(result) => {
                match result {
                    Ok(settings) => self.settings = settings,
                    Err(e) => tracing::warn!("Failed to load settings, using defaults: {}", e),
                }
                palette::set_theme(self.settings.theme_mode);

                if self.services.is_none() {
                    return Task::perform(
                        open_services(self.settings.core.files_path.clone()),
                        Message::ServicesReady,
                    );
                }
            }
            Message::SettingsSaved(result) => {
                if let Err(e) = result {
                    self.toasts.error(format!("Failed to save settings: {e}"));
                }
            }
            Message::Settings(msg) => {
                return self.handle_settings(msg);
            }
            Message::ServicesReady(result) => match result {
                Ok(services) => {
                    info!("Stores opened at {:?}", services.storage_root);
                    self.services = Some(Arc::clone(&services));
                    return Task::perform(load_topics(services), Message::TopicsLoaded);
                }
                Err(e) => {
                    self.error_message = Some(format!("Failed to open storage: {e}"));
                }
            },
            Message::TopicsLoaded(result) => match result {
                Ok(topics) => {
                    self.topics = topics;
                    if self.selected_topic.is_none()
                        && let Some(first) = self.topics.first().cloned()
                    {
                        return Task::done(Message::SelectTopic(first));
                    }
                }
                Err(e) => {
                    self.error_message = Some(format!("Failed to load topics: {e}"));
                }
            },
            Message::SelectTopic(topic) => {
                self.select_topic(topic);
                return self.reload_conversation();
            }
            Message::Refresh => {
                return self.reload_conversation();
            }
            Message::ConversationLoaded(result) => match result {
                Ok(conversation) => {
                    return self.show_conversation(conversation);
                }
                Err(e) => {
                    self.error_message = Some(format!("Failed to load conversation: {e}"));
                }
            },
            Message::ImageUrlChanged(url) => {
                self.image_url = url;
            }
            Message::AddImage => {
                let url = self.image_url.trim().to_string();
                if let Some(services) = self.services.clone()
                    && let Some(topic) = self.selected_topic.clone()
                    && !url.is_empty()
                {
                    self.image_url.clear();
                    return Task::perform(
                        add_image_message(services, topic, url),
                        Message::ImageAdded,
                    );
                }
            }
            Message::ImageAdded(result) => match result {
                Ok(()) => return self.reload_conversation(),
                Err(e) => self.toasts.error(e),
            },
            Message::ImageLoaded(key, result) => {
                self.images.finish(key, result);
            }
            Message::LocalizeFinished(block_id, outcome) => {
                return self.handle_localized(block_id, outcome);
            }
            Message::LocalizationApplied(result) => match result {
                Ok(true) => return self.reload_conversation(),
                Ok(false) => {}
                Err(e) => tracing::warn!("Failed to store localized image: {}", e),
            },
            Message::OpenViewer(display) => {
                let source = display.source.clone();
                self.viewer = Some(ViewerState::new(display));
                if let Some(services) = self.services.clone() {
                    return Task::perform(load_payload(services, source), |result| {
                        ViewerMessage::PayloadLoaded(result).into()
                    });
                }
            }
            Message::Viewer(msg) => {
                return self.handle_viewer(msg);
            }
            Message::ImageAction(action, display) => {
                return self.run_image_action(action, display);
            }
            Message::ActionFinished(result) => match result {
                Ok(text) => self.toasts.success(text),
                Err(e) => self.toasts.error(e),
            },
            Message::OpenLink(url) => {
                if let Err(e) = opener::open_browser(&url) {
                    self.toasts.error(format!("Cannot open link: {e}"));
                }
            }
            Message::DismissToast(id) => {
                self.toasts.dismiss(id);
            }
            Message::Tick(now) => {
                self.toasts.expire(now);
            }
            Message::KeyPressed(action) => {
                return self.handle_keyboard_action(action);
            }
            Message::Ignored => {}
        }
        Task::none()
    }

    /// Switch topics, tearing down the old presentation and its images.
    fn select_topic(&mut self, topic: TopicId) {
        if self.selected_topic.as_ref() != Some(&topic) {
            if let Some(mut old) = self.conversation.take() {
                old.teardown();
            }
            self.images.clear();
        }
        self.selected_topic = Some(topic);
        self.error_message = None;
    }

    /// Load the selected topic again.
    fn reload_conversation(&self) -> Task<Message> {
        match (&self.services, &self.selected_topic) {
            (Some(services), Some(topic)) => Task::perform(
                load_conversation(Arc::clone(services), topic.clone()),
                Message::ConversationLoaded,
            ),
            _ => Task::none(),
        }
    }

    /// Present a loaded topic, keeping presenters if it is already open.
    fn show_conversation(&mut self, conversation: Conversation) -> Task<Message> {
        let Some(services) = self.services.clone() else {
            return Task::none();
        };
        if self.selected_topic.as_ref() != Some(&conversation.topic_id) {
            tracing::debug!("Dropping stale load of topic {}", conversation.topic_id);
            return Task::none();
        }

        let state = self.conversation.get_or_insert_with(|| {
            ConversationState::new(conversation.topic_id.clone(), Arc::clone(&services.localize))
        });
        let work = state.load(conversation, &self.settings.core);
        self.schedule(&services, work)
    }

    /// Present the open topic again with the current settings.
    fn refresh_conversation(&mut self) -> Task<Message> {
        let Some(services) = self.services.clone() else {
            return Task::none();
        };
        match self.conversation.as_mut() {
            Some(state) => {
                let work = state.refresh(&self.settings.core);
                self.schedule(&services, work)
            }
            None => Task::none(),
        }
    }

    /// Turn presentation work into tasks: localization results and image loads.
    fn schedule(&mut self, services: &Arc<Services>, work: PresentedWork) -> Task<Message> {
        let mut tasks = Vec::new();

        for (block_id, task) in work.localizations {
            tasks.push(Task::perform(task.outcome(), move |outcome| {
                Message::LocalizeFinished(block_id.clone(), outcome)
            }));
        }

        for display in work.images {
            let key = display.source.to_string();
            if self.images.begin(&key) {
                tasks.push(Task::perform(
                    load_display_image(Arc::clone(services), display.source),
                    move |result| Message::ImageLoaded(key.clone(), result),
                ));
            }
        }

        Task::batch(tasks)
    }

    fn handle_localized(&mut self, block_id: BlockId, outcome: LocalizeOutcome) -> Task<Message> {
        match outcome {
            LocalizeOutcome::Localized(localized) => {
                info!("Localized {} as {}", localized.original, localized.local);
                match self.services.clone() {
                    Some(services) => Task::perform(
                        store_localized(services, block_id, localized),
                        Message::LocalizationApplied,
                    ),
                    None => Task::none(),
                }
            }
            LocalizeOutcome::Failed { original, reason } => {
                tracing::debug!("Keeping remote image {}: {}", original, reason);
                Task::none()
            }
            LocalizeOutcome::Cancelled { .. } => Task::none(),
        }
    }

    /// Handle settings screen messages.
    fn handle_settings(&mut self, msg: SettingsMessage) -> Task<Message> {
        let mut represent = false;
        match msg {
            SettingsMessage::SelectSection(section) => {
                self.settings_state.selected_section = section;
                return Task::none();
            }
            SettingsMessage::ToggleTheme => {
                self.settings.theme_mode = self.settings.theme_mode.toggled();
                palette::set_theme(self.settings.theme_mode);
            }
            SettingsMessage::ToggleAutoLocalize(on) => {
                self.settings.core.auto_localize_images = on;
                represent = true;
            }
            SettingsMessage::SelectMathEngine(engine) => {
                self.settings.core.math_engine = engine;
                represent = true;
            }
            SettingsMessage::ToggleSingleDollar(on) => {
                self.settings.core.math_enable_single_dollar = on;
                represent = true;
            }
        }

        let save = Task::perform(save_settings(self.settings.clone()), Message::SettingsSaved);
        if represent {
            Task::batch([save, self.refresh_conversation()])
        } else {
            save
        }
    }

    /// Handle image preview messages.
    fn handle_viewer(&mut self, msg: ViewerMessage) -> Task<Message> {
        let Some(viewer) = self.viewer.as_mut() else {
            return Task::none();
        };

        let before = viewer.transform;
        match msg {
            ViewerMessage::FlipVertical => viewer.transform.flip_vertical(),
            ViewerMessage::FlipHorizontal => viewer.transform.flip_horizontal(),
            ViewerMessage::RotateLeft => viewer.transform.rotate_left(),
            ViewerMessage::RotateRight => viewer.transform.rotate_right(),
            ViewerMessage::ZoomOut => viewer.transform.zoom_out(),
            ViewerMessage::ZoomIn => viewer.transform.zoom_in(),
            ViewerMessage::Reset => viewer.transform.reset(),
            ViewerMessage::Close => {
                self.viewer = None;
                return Task::none();
            }
            ViewerMessage::PayloadLoaded(result) => {
                return match result {
                    Ok(payload) => {
                        viewer.payload = Some(Arc::clone(&payload));
                        render_task(payload, viewer.transform)
                    }
                    Err(e) => {
                        viewer.error = Some(e);
                        Task::none()
                    }
                };
            }
            ViewerMessage::Rendered(result) => {
                match result {
                    Ok(rendered) => viewer.rendered = Some(rendered),
                    Err(e) => viewer.error = Some(e),
                }
                return Task::none();
            }
        }

        let orientation_changed = before.quarter_turns != viewer.transform.quarter_turns
            || before.flip_x != viewer.transform.flip_x
            || before.flip_y != viewer.transform.flip_y;
        match (&viewer.payload, orientation_changed) {
            (Some(payload), true) => render_task(Arc::clone(payload), viewer.transform),
            _ => Task::none(),
        }
    }

    /// Start an image action, reusing bytes already loaded by the preview.
    fn run_image_action(&self, action: ImageAction, display: DisplayImage) -> Task<Message> {
        let Some(services) = self.services.clone() else {
            return Task::none();
        };
        let loaded = self
            .viewer
            .as_ref()
            .filter(|viewer| viewer.image == display)
            .and_then(|viewer| viewer.payload.clone());

        Task::perform(
            image_action(services, action, display.source, loaded),
            Message::ActionFinished,
        )
    }

    /// Handle keyboard shortcut actions.
    fn handle_keyboard_action(&mut self, action: KeyboardAction) -> Task<Message> {
        match action {
            KeyboardAction::Cancel => {
                if self.viewer.is_some() {
                    self.viewer = None;
                } else if self.current_view == View::Settings {
                    self.current_view = View::Conversation;
                }
                Task::none()
            }
            KeyboardAction::Settings => {
                self.current_view = View::Settings;
                Task::none()
            }
            KeyboardAction::Refresh => self.reload_conversation(),
            KeyboardAction::ZoomIn => self.handle_viewer(ViewerMessage::ZoomIn),
            KeyboardAction::ZoomOut => self.handle_viewer(ViewerMessage::ZoomOut),
            KeyboardAction::ResetView => self.handle_viewer(ViewerMessage::Reset),
        }
    }

    /// Render current state as UI.
    fn view(&self) -> Element<'_, Message> {
        let main: Element<'_, Message> = match self.current_view {
            View::Conversation => row![
                view::view_sidebar(&self.topics, self.selected_topic.as_ref()),
                view::view_conversation(
                    self.conversation.as_ref(),
                    &self.images,
                    &self.image_url,
                    self.error_message.as_deref(),
                ),
            ]
            .height(Length::Fill)
            .into(),
            View::Settings => view::view_settings(&self.settings_state, &self.settings),
        };

        let mut layers = stack![main].width(Length::Fill).height(Length::Fill);
        if let Some(viewer) = &self.viewer {
            layers = layers.push(view::view_image_viewer(viewer));
        }
        if !self.toasts.is_empty() {
            layers = layers.push(view::view_toasts(&self.toasts));
        }
        layers.into()
    }

    /// Theme for built-in widgets.
    fn theme(&self) -> iced::Theme {
        match self.settings.theme_mode {
            ThemeMode::Light => iced::Theme::Light,
            ThemeMode::Dark => iced::Theme::Dark,
        }
    }

    /// Keyboard shortcuts, plus a tick while toasts are visible.
    fn subscription(&self) -> Subscription<Message> {
        let keys = keyboard::listen().map(|event| {
            if let keyboard::Event::KeyPressed { key, modifiers, .. } = event {
                handle_key_press(key, modifiers).unwrap_or(Message::Ignored)
            } else {
                Message::Ignored
            }
        });

        if self.toasts.is_empty() {
            keys
        } else {
            Subscription::batch([keys, iced::time::every(TOAST_TICK).map(Message::Tick)])
        }
    }
}

/// Handle keyboard shortcuts and return appropriate message.
fn handle_key_press(key: Key, modifiers: Modifiers) -> Option<Message> {
    let ctrl = modifiers.command(); // Ctrl on Linux/Windows, Cmd on macOS

    match key {
        Key::Named(keyboard::key::Named::Escape) => {
            Some(Message::KeyPressed(KeyboardAction::Cancel))
        }
        Key::Named(keyboard::key::Named::F5) => Some(Message::KeyPressed(KeyboardAction::Refresh)),
        Key::Character(c) if ctrl && c.as_str() == "," => {
            Some(Message::KeyPressed(KeyboardAction::Settings))
        }
        Key::Character(c) if !ctrl && matches!(c.as_str(), "+" | "=") => {
            Some(Message::KeyPressed(KeyboardAction::ZoomIn))
        }
        Key::Character(c) if !ctrl && c.as_str() == "-" => {
            Some(Message::KeyPressed(KeyboardAction::ZoomOut))
        }
        Key::Character(c) if !ctrl && c.as_str() == "0" => {
            Some(Message::KeyPressed(KeyboardAction::ResetView))
        }
        _ => None,
    }
}

fn render_task(payload: Arc<ImagePayload>, transform: ViewerTransform) -> Task<Message> {
    Task::perform(render_image(payload, transform), |result| {
        ViewerMessage::Rendered(result).into()
    })
}

/// Load application settings from file.
async fn load_settings() -> Result<AppSettings, String> {
    parlor_core::settings::load(&parlor_core::settings::settings_path())
        .await
        .map_err(|e| e.to_string())
}

/// Save application settings to file.
async fn save_settings(settings: AppSettings) -> Result<(), String> {
    parlor_core::settings::save(&parlor_core::settings::settings_path(), &settings)
        .await
        .map_err(|e| e.to_string())
}

/// Open the message store, the file store and the localization context.
async fn open_services(files_path: PathBuf) -> Result<Arc<Services>, String> {
    let data_dir = parlor_core::settings::data_dir();
    tokio::fs::create_dir_all(&data_dir)
        .await
        .map_err(|e| e.to_string())?;
    let database = data_dir.join("parlor.db");
    let database = database.to_string_lossy();

    let store = MessageStore::new(&database)
        .await
        .map_err(|e| e.to_string())?;
    let files = FileStore::new(files_path.clone(), &database)
        .await
        .map_err(|e| e.to_string())?;

    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("parlor/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| e.to_string())?;
    let downloader = HttpDownloader::with_client(http.clone(), data_dir.join("tmp"));
    let localize = LocalizeContext::new(Arc::new(downloader), Arc::new(files))
        .map_err(|e| e.to_string())?;

    Ok(Arc::new(Services {
        store,
        localize: Arc::new(localize),
        http,
        storage_root: files_path,
        clipboard: Mutex::new(None),
    }))
}

/// List topics, creating the welcome topic on first start.
async fn load_topics(services: Arc<Services>) -> Result<Vec<TopicId>, String> {
    let topics = services.store.topics().await.map_err(|e| e.to_string())?;
    if !topics.is_empty() {
        return Ok(topics);
    }

    seed_welcome(&services.store)
        .await
        .map_err(|e| e.to_string())?;
    services.store.topics().await.map_err(|e| e.to_string())
}

async fn seed_welcome(store: &MessageStore) -> parlor_core::Result<()> {
    const QUESTION: &str = "What can this client show?";
    const ANSWER: &str = r#"## Welcome to Parlor

Answers render as **Markdown** with _emphasis_, ~~strikethrough~~ and `inline code`.

- [x] Tables and task lists
- [ ] Math such as \(e^{i\pi} + 1 = 0\) and $a^2 + b^2 = c^2$

\[
\int_0^1 x^2 \, dx = \frac{1}{3}
\]

| Source | Stored as |
| --- | --- |
| `https://...` | `http://file/<id>.png` |
| `data:image/...` | kept inline |

```rust
fn main() {
    println!("hello");
}
```

Generated images below are saved to local storage the first time they are shown.
See [the iced project](https://iced.rs) for the GUI toolkit."#;

    let topic = TopicId::from(WELCOME_TOPIC);

    let mut question = ChatMessage::new(topic.clone(), MessageRole::User);
    let question_block = MessageBlock::main_text(question.id.clone(), QUESTION);
    question.block_ids.push(question_block.id.clone());
    store.commit(&topic, &question, &[question_block]).await?;

    let mut answer = ChatMessage::new(topic.clone(), MessageRole::Assistant);
    let text = MessageBlock::main_text(answer.id.clone(), ANSWER);
    let images = MessageBlock::generated_images(
        answer.id.clone(),
        BlockStatus::Success,
        vec!["https://rustacean.net/assets/rustacean-flat-happy.png".to_string()],
    );
    answer.block_ids.push(text.id.clone());
    answer.block_ids.push(images.id.clone());
    store.commit(&topic, &answer, &[text, images]).await?;

    info!("Created topic {}", topic);
    Ok(())
}

/// Load the messages and blocks of a topic.
async fn load_conversation(
    services: Arc<Services>,
    topic_id: TopicId,
) -> Result<Conversation, String> {
    let messages = services
        .store
        .messages_for_topic(&topic_id)
        .await
        .map_err(|e| e.to_string())?;

    let mut entries = Vec::with_capacity(messages.len());
    for message in messages {
        let blocks = services
            .store
            .blocks_for_message(&message.id)
            .await
            .map_err(|e| e.to_string())?;
        entries.push(ConversationEntry { message, blocks });
    }

    Ok(Conversation { topic_id, entries })
}

/// Store an image message for a typed reference.
async fn add_image_message(
    services: Arc<Services>,
    topic: TopicId,
    reference: String,
) -> Result<(), String> {
    ImageRef::parse(&reference).map_err(|e| format!("Not an image reference: {e}"))?;

    let mut message = ChatMessage::new(topic.clone(), MessageRole::Assistant);
    let block =
        MessageBlock::generated_images(message.id.clone(), BlockStatus::Success, vec![reference]);
    message.block_ids.push(block.id.clone());

    services
        .store
        .commit(&topic, &message, &[block])
        .await
        .map_err(|e| e.to_string())
}

/// Write a localized reference back into its block.
async fn store_localized(
    services: Arc<Services>,
    block_id: BlockId,
    localized: Localized,
) -> Result<bool, String> {
    apply_localization(&services.store, &block_id, &localized)
        .await
        .map_err(|e| e.to_string())
}

/// Fetch and decode an image for display.
async fn load_display_image(
    services: Arc<Services>,
    source: ImageRef,
) -> Result<image::Handle, String> {
    let payload = load_image(&source, &services.storage_root, &services.http)
        .await
        .map_err(|e| e.to_string())?;
    Ok(image::Handle::from_bytes(payload.bytes))
}

/// Fetch the original bytes of an image.
async fn load_payload(
    services: Arc<Services>,
    source: ImageRef,
) -> Result<Arc<ImagePayload>, String> {
    load_image(&source, &services.storage_root, &services.http)
        .await
        .map(Arc::new)
        .map_err(|e| e.to_string())
}

/// Decode and orient an image off the UI thread.
async fn render_image(
    payload: Arc<ImagePayload>,
    transform: ViewerTransform,
) -> Result<RenderedImage, String> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<RenderedImage> {
        let decoded = ::image::load_from_memory(&payload.bytes).context("unsupported image")?;
        let pixels = transform.orient(decoded).to_rgba8();
        let (width, height) = pixels.dimensions();

        Ok(RenderedImage {
            width,
            height,
            handle: image::Handle::from_rgba(width, height, pixels.into_raw()),
        })
    })
    .await
    .map_err(|e| e.to_string())?
    .map_err(|e| format!("{e:#}"))
}

/// Copy, download or copy-as-bitmap an image; returns the toast text.
async fn image_action(
    services: Arc<Services>,
    action: ImageAction,
    source: ImageRef,
    loaded: Option<Arc<ImagePayload>>,
) -> Result<String, String> {
    match action {
        ImageAction::CopyUrl => {
            let text = source.to_string();
            tokio::task::spawn_blocking(move || copy_to_clipboard(&services, Clip::Text(text)))
                .await
                .map_err(|e| e.to_string())?
                .map(|()| "Image address copied".to_string())
                .map_err(|e| format!("Copy failed: {e:#}"))
        }
        ImageAction::Download => {
            let payload = obtain_payload(&services, source, loaded).await?;
            let dir = dirs::download_dir()
                .or_else(dirs::home_dir)
                .ok_or_else(|| "No download directory".to_string())?;
            let path = save_to_directory(&payload, &dir)
                .await
                .map_err(|e| format!("Download failed: {e}"))?;
            Ok(format!("Saved to {}", path.display()))
        }
        ImageAction::CopyImage => {
            let payload = obtain_payload(&services, source, loaded).await?;
            tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
                let decoded =
                    ::image::load_from_memory(&payload.bytes).context("unsupported image")?;
                let pixels = decoded.to_rgba8();
                copy_to_clipboard(&services, Clip::Image(&pixels))
            })
            .await
            .map_err(|e| e.to_string())?
            .map(|()| "Image copied".to_string())
            .map_err(|e| format!("Copy failed: {e:#}"))
        }
    }
}

async fn obtain_payload(
    services: &Arc<Services>,
    source: ImageRef,
    loaded: Option<Arc<ImagePayload>>,
) -> Result<Arc<ImagePayload>, String> {
    match loaded {
        Some(payload) => Ok(payload),
        None => load_payload(Arc::clone(services), source).await,
    }
}

enum Clip<'a> {
    Text(String),
    Image(&'a ::image::RgbaImage),
}

/// Put text or pixels on the clipboard, keeping the clipboard open afterwards.
fn copy_to_clipboard(services: &Services, clip: Clip<'_>) -> anyhow::Result<()> {
    let mut guard = services
        .clipboard
        .lock()
        .map_err(|_| anyhow!("clipboard lock poisoned"))?;
    if guard.is_none() {
        *guard = Some(arboard::Clipboard::new().context("clipboard unavailable")?);
    }
    let Some(clipboard) = guard.as_mut() else {
        bail!("clipboard unavailable");
    };

    match clip {
        Clip::Text(text) => clipboard.set_text(text)?,
        Clip::Image(pixels) => clipboard.set_image(arboard::ImageData {
            width: usize::try_from(pixels.width())?,
            height: usize::try_from(pixels.height())?,
            bytes: Cow::Borrowed(pixels.as_raw().as_slice()),
        })?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn press(c: &str, modifiers: Modifiers) -> Option<Message> {
        handle_key_press(Key::Character(c.into()), modifiers)
    }

    #[test]
    fn test_zoom_shortcuts() {
        assert!(matches!(
            press("+", Modifiers::empty()),
            Some(Message::KeyPressed(KeyboardAction::ZoomIn))
        ));
        assert!(matches!(
            press("-", Modifiers::empty()),
            Some(Message::KeyPressed(KeyboardAction::ZoomOut))
        ));
        assert!(press("-", Modifiers::COMMAND).is_none());
    }

    #[test]
    fn test_escape_cancels() {
        assert!(matches!(
            handle_key_press(
                Key::Named(keyboard::key::Named::Escape),
                Modifiers::empty()
            ),
            Some(Message::KeyPressed(KeyboardAction::Cancel))
        ));
    }

    #[test]
    fn test_switching_topic_forgets_images() {
        let mut app = Parlor::default();
        app.select_topic(TopicId::from("a"));
        assert!(app.images.begin("https://x/a.png"));

        app.select_topic(TopicId::from("a"));
        assert!(app.images.get("https://x/a.png").is_some());

        app.select_topic(TopicId::from("b"));
        assert!(app.images.get("https://x/a.png").is_none());
        assert_eq!(app.selected_topic, Some(TopicId::from("b")));
    }

    #[test]
    fn test_escape_closes_viewer_before_leaving_settings() {
        let mut app = Parlor {
            current_view: View::Settings,
            ..Parlor::default()
        };
        app.viewer = Some(ViewerState::new(DisplayImage {
            raw: "https://x/a.png".to_string(),
            source: ImageRef::parse("https://x/a.png").unwrap(),
        }));

        let _ = app.handle_keyboard_action(KeyboardAction::Cancel);
        assert!(app.viewer.is_none());
        assert_eq!(app.current_view, View::Settings);

        let _ = app.handle_keyboard_action(KeyboardAction::Cancel);
        assert_eq!(app.current_view, View::Conversation);
    }
}
