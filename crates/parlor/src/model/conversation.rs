//! The open topic and how each of its blocks presents.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parlor_core::{
    BlockContent, BlockId, DisplayImage, HttpDownloader, ImageBlockView, ImagePresenter,
    LocalizeContext, LocalizeTask, Localizer, MarkdownDocument, MarkdownOptions, MarkdownSource,
    Message as ChatMessage, MessageBlock, Settings, TopicId,
};

/// Text shown for a paused block that produced nothing.
pub const PAUSED_LABEL: &str = "Generation paused.";

/// A message with its blocks in display order.
#[derive(Debug, Clone)]
pub struct ConversationEntry {
    /// The message.
    pub message: ChatMessage,
    /// Its blocks.
    pub blocks: Vec<MessageBlock>,
}

/// Messages of one topic, oldest first.
#[derive(Debug, Clone)]
pub struct Conversation {
    /// The topic.
    pub topic_id: TopicId,
    /// Messages and blocks.
    pub entries: Vec<ConversationEntry>,
}

/// A text block ready to draw.
#[derive(Debug, Clone)]
pub struct TextView {
    /// Parsed Markdown.
    pub document: MarkdownDocument,
    /// True when the document is the paused label.
    pub is_placeholder: bool,
    /// Resolved images keyed by the reference written in the Markdown.
    pub images: HashMap<String, DisplayImage>,
}

/// Follow-up work produced by presenting blocks.
#[derive(Debug, Default)]
pub struct PresentedWork {
    /// Localizations started, with the block they belong to.
    pub localizations: Vec<(BlockId, LocalizeTask)>,
    /// Images that need loading for display.
    pub images: Vec<DisplayImage>,
}

/// Presentation state of the open topic.
///
/// Presenters are kept per image block across reloads of the same topic,
/// so re-rendering never starts a second localization for a source.
pub struct ConversationState {
    conversation: Conversation,
    context: Arc<LocalizeContext<HttpDownloader>>,
    image_presenters: HashMap<BlockId, ImagePresenter<HttpDownloader>>,
    markdown_presenter: ImagePresenter<HttpDownloader>,
    image_views: HashMap<BlockId, ImageBlockView>,
    text_views: HashMap<BlockId, TextView>,
}

impl fmt::Debug for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationState")
            .field("topic_id", &self.conversation.topic_id)
            .field("entries", &self.conversation.entries.len())
            .field("image_presenters", &self.image_presenters.len())
            .finish_non_exhaustive()
    }
}

impl ConversationState {
    /// Creates an empty state for a topic.
    #[must_use]
    pub fn new(topic_id: TopicId, context: Arc<LocalizeContext<HttpDownloader>>) -> Self {
        // Markdown images are display-only: no block to write back to.
        let markdown_presenter = ImagePresenter::new(Localizer::new(Arc::clone(&context)), None);

        Self {
            conversation: Conversation {
                topic_id,
                entries: Vec::new(),
            },
            context,
            image_presenters: HashMap::new(),
            markdown_presenter,
            image_views: HashMap::new(),
            text_views: HashMap::new(),
        }
    }

    /// The topic shown.
    #[must_use]
    pub const fn topic_id(&self) -> &TopicId {
        &self.conversation.topic_id
    }

    /// Messages and blocks.
    #[must_use]
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.conversation.entries
    }

    /// View of an image block.
    #[must_use]
    pub fn image_view(&self, id: &BlockId) -> Option<&ImageBlockView> {
        self.image_views.get(id)
    }

    /// View of a text block.
    #[must_use]
    pub fn text_view(&self, id: &BlockId) -> Option<&TextView> {
        self.text_views.get(id)
    }

    /// Replace the contents with a freshly loaded copy of the same topic.
    ///
    /// Presenters of blocks that disappeared are dropped, which cancels
    /// their pending localizations.
    pub fn load(&mut self, conversation: Conversation, settings: &Settings) -> PresentedWork {
        let live: std::collections::HashSet<&BlockId> = conversation
            .entries
            .iter()
            .flat_map(|entry| entry.blocks.iter().map(|block| &block.id))
            .collect();
        self.image_presenters.retain(|id, _| live.contains(id));

        self.conversation = conversation;
        self.refresh(settings)
    }

    /// Present every block again, e.g. after a settings change.
    pub fn refresh(&mut self, settings: &Settings) -> PresentedWork {
        let mut work = PresentedWork::default();
        self.image_views.clear();
        self.text_views.clear();

        let options = MarkdownOptions::from_settings(settings);
        for entry in &self.conversation.entries {
            for block in &entry.blocks {
                match &block.content {
                    BlockContent::Image { .. } => {
                        let presenter =
                            self.image_presenters.entry(block.id.clone()).or_insert_with(|| {
                                ImagePresenter::new(
                                    Localizer::new(Arc::clone(&self.context)),
                                    Some(block.id.clone()),
                                )
                            });

                        let presentation = presenter.present(block, settings);
                        work.localizations.extend(
                            presentation
                                .started
                                .into_iter()
                                .map(|task| (block.id.clone(), task)),
                        );
                        if let ImageBlockView::Images(images) = &presentation.view {
                            work.images.extend(images.iter().cloned());
                        }
                        self.image_views.insert(block.id.clone(), presentation.view);
                    }
                    _ => {
                        let Some(source) = MarkdownSource::for_block(block, PAUSED_LABEL) else {
                            continue;
                        };
                        let document = MarkdownDocument::parse(source.text, &options);

                        let mut images = HashMap::new();
                        for raw in document.image_sources() {
                            if let Some((image, _)) =
                                self.markdown_presenter.present_source(raw, settings)
                            {
                                work.images.push(image.clone());
                                images.insert(raw.to_string(), image);
                            }
                        }

                        self.text_views.insert(
                            block.id.clone(),
                            TextView {
                                document,
                                is_placeholder: source.is_placeholder,
                                images,
                            },
                        );
                    }
                }
            }
        }

        work
    }

    /// Cancel every outstanding localization of this topic.
    pub fn teardown(&mut self) {
        for presenter in self.image_presenters.values_mut() {
            presenter.teardown();
        }
        self.markdown_presenter.teardown();
    }
}
