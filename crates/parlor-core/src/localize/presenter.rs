//! Turning image blocks into display sources and kicking off localization.

use std::collections::HashSet;
use std::path::Path;

use parlor_media::ImageRef;

use super::localizer::{LocalizeTask, Localizer};
use crate::message::{BlockId, BlockStatus, MessageBlock};
use crate::service::Downloader;
use crate::settings::Settings;

/// One image ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayImage {
    /// Reference string as stored in the block.
    pub raw: String,
    /// Parsed reference with blob names resolved to local paths.
    pub source: ImageRef,
}

/// What an image block renders as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageBlockView {
    /// Loading placeholder.
    Placeholder,
    /// Zero or more images.
    Images(Vec<DisplayImage>),
    /// Nothing.
    Hidden,
}

/// Result of presenting a block.
#[derive(Debug)]
pub struct Presentation {
    /// What to render.
    pub view: ImageBlockView,
    /// Localizations started by this call.
    pub started: Vec<LocalizeTask>,
}

/// Reference strings a displayable image block shows, in order.
///
/// The generated image list wins; otherwise a stored file is shown from the
/// storage root.
#[must_use]
pub fn display_references(block: &MessageBlock, storage_root: &Path) -> Vec<String> {
    if let Some(images) = block.generated_image_refs()
        && !images.is_empty()
    {
        return images.to_vec();
    }

    block
        .stored_file()
        .map(|file| {
            vec![
                ImageRef::File {
                    path: storage_root.join(&file.name),
                }
                .to_string(),
            ]
        })
        .unwrap_or_default()
}

/// Presentation state of one image view.
///
/// Each distinct display source is handed to the localizer at most once for
/// the lifetime of the presenter, however often the view re-renders.
pub struct ImagePresenter<D: Downloader> {
    localizer: Localizer<D>,
    rewrite_target: Option<BlockId>,
    processed: HashSet<String>,
}

impl<D: Downloader> ImagePresenter<D> {
    /// Creates a presenter. Without a rewrite target nothing is localized.
    #[must_use]
    pub fn new(localizer: Localizer<D>, rewrite_target: Option<BlockId>) -> Self {
        Self {
            localizer,
            rewrite_target,
            processed: HashSet::new(),
        }
    }

    /// Block that localized references are written back to.
    #[must_use]
    pub const fn rewrite_target(&self) -> Option<&BlockId> {
        self.rewrite_target.as_ref()
    }

    /// Map a block to its view, starting localizations where needed.
    pub fn present(&mut self, block: &MessageBlock, settings: &Settings) -> Presentation {
        match block.status {
            BlockStatus::Pending => Presentation {
                view: ImageBlockView::Placeholder,
                started: Vec::new(),
            },
            BlockStatus::Streaming | BlockStatus::Success => {
                let mut images = Vec::new();
                let mut started = Vec::new();

                for raw in display_references(block, &settings.files_path) {
                    if let Some((image, task)) = self.present_source(&raw, settings) {
                        images.push(image);
                        started.extend(task);
                    }
                }

                Presentation {
                    view: ImageBlockView::Images(images),
                    started,
                }
            }
            BlockStatus::Processing | BlockStatus::Error | BlockStatus::Paused => Presentation {
                view: ImageBlockView::Hidden,
                started: Vec::new(),
            },
        }
    }

    /// Resolve a single reference for display.
    ///
    /// Returns `None` for references that cannot be parsed.
    pub fn present_source(
        &mut self,
        raw: &str,
        settings: &Settings,
    ) -> Option<(DisplayImage, Option<LocalizeTask>)> {
        let source = match ImageRef::parse(raw) {
            Ok(source) => source.resolve(&settings.files_path),
            Err(e) => {
                tracing::warn!("Skipping image reference: {}", e);
                return None;
            }
        };

        let image = DisplayImage {
            raw: raw.to_string(),
            source,
        };
        let task = self.maybe_localize(&image, settings);
        Some((image, task))
    }

    fn maybe_localize(&mut self, image: &DisplayImage, settings: &Settings) -> Option<LocalizeTask> {
        if !settings.auto_localize_images || self.rewrite_target.is_none() {
            return None;
        }
        let url = image.source.as_url()?;

        if !self.processed.insert(image.source.to_string()) {
            return None;
        }
        self.localizer.localize(&image.raw, url)
    }

    /// Cancel outstanding localizations and forget processed sources.
    pub fn teardown(&mut self) {
        self.localizer.cancel_all();
        self.processed.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use chrono::Utc;
    use parlor_media::MediaType;

    use super::*;
    use crate::files::{FileRecord, FileStore};
    use crate::localize::LocalizeContext;
    use crate::localize::testing::MockDownloader;
    use crate::message::{BlockContent, MessageId};

    fn settings(root: &Path) -> Settings {
        Settings {
            files_path: root.to_path_buf(),
            ..Settings::default()
        }
    }

    async fn presenter(
        downloader: MockDownloader,
        root: &Path,
        target: Option<BlockId>,
    ) -> ImagePresenter<MockDownloader> {
        let files = Arc::new(FileStore::in_memory(root).await.unwrap());
        let context = Arc::new(LocalizeContext::new(Arc::new(downloader), files).unwrap());
        ImagePresenter::new(Localizer::new(context), target)
    }

    fn block(status: BlockStatus, images: &[&str]) -> MessageBlock {
        MessageBlock::generated_images(
            MessageId::from("m1"),
            status,
            images.iter().map(ToString::to_string).collect(),
        )
    }

    #[test]
    fn test_display_references_prefers_generated_images() {
        let block = block(BlockStatus::Success, &["https://x/a.png"]);
        assert_eq!(
            display_references(&block, Path::new("/data/Files")),
            vec!["https://x/a.png".to_string()]
        );
    }

    #[test]
    fn test_display_references_falls_back_to_stored_file() {
        let file = FileRecord {
            id: "f".to_string(),
            name: "f.png".to_string(),
            origin_name: "cat.png".to_string(),
            ext: "png".to_string(),
            size: 3,
            media_type: MediaType::image_png(),
            count: 1,
            created_at: Utc::now(),
        };
        let block = MessageBlock::new(
            MessageId::from("m1"),
            BlockStatus::Success,
            BlockContent::Image {
                metadata: None,
                file: Some(file),
            },
        );

        assert_eq!(
            display_references(&block, Path::new("/data/Files")),
            vec!["file:///data/Files/f.png".to_string()]
        );
        let empty = MessageBlock::new(
            MessageId::from("m1"),
            BlockStatus::Success,
            BlockContent::Image {
                metadata: None,
                file: None,
            },
        );
        assert!(display_references(&empty, Path::new("/data/Files")).is_empty());
    }

    #[tokio::test]
    async fn test_pending_shows_placeholder_without_localizing() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = MockDownloader::returning(b"png".to_vec(), dir.path().join("tmp"));
        let calls = downloader.calls();
        let mut presenter = presenter(downloader, dir.path(), Some(BlockId::from("b1"))).await;

        let presentation =
            presenter.present(&block(BlockStatus::Pending, &["https://x/a.png"]), &settings(dir.path()));

        assert_eq!(presentation.view, ImageBlockView::Placeholder);
        assert!(presentation.started.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_statuses_are_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let mut presenter =
            presenter(MockDownloader::failing(), dir.path(), Some(BlockId::from("b1"))).await;

        for status in [BlockStatus::Processing, BlockStatus::Error, BlockStatus::Paused] {
            let presentation =
                presenter.present(&block(status, &["https://x/a.png"]), &settings(dir.path()));
            assert_eq!(presentation.view, ImageBlockView::Hidden);
            assert!(presentation.started.is_empty());
        }
    }

    #[tokio::test]
    async fn test_success_localizes_once_across_renders() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = MockDownloader::returning(b"png".to_vec(), dir.path().join("tmp"));
        let mut presenter = presenter(downloader, dir.path(), Some(BlockId::from("b1"))).await;
        let block = block(BlockStatus::Success, &["https://x/a.png", "http://file/local.png"]);
        let settings = settings(dir.path());

        let first = presenter.present(&block, &settings);
        assert_eq!(first.started.len(), 1);
        assert_eq!(first.started[0].original(), "https://x/a.png");

        let ImageBlockView::Images(images) = &first.view else {
            panic!("expected images");
        };
        assert_eq!(images.len(), 2);
        assert_eq!(
            images[1].source,
            ImageRef::File {
                path: dir.path().join("local.png")
            }
        );

        for task in first.started {
            task.outcome().await;
        }
        let second = presenter.present(&block, &settings);
        assert!(second.started.is_empty());
    }

    #[tokio::test]
    async fn test_no_localization_without_target_or_setting() {
        let dir = tempfile::tempdir().unwrap();
        let block = block(BlockStatus::Streaming, &["https://x/a.png"]);

        let mut untargeted = presenter(MockDownloader::failing(), dir.path(), None).await;
        assert!(untargeted.present(&block, &settings(dir.path())).started.is_empty());

        let mut targeted =
            presenter(MockDownloader::failing(), dir.path(), Some(BlockId::from("b1"))).await;
        let disabled = Settings {
            auto_localize_images: false,
            ..settings(dir.path())
        };
        assert!(targeted.present(&block, &disabled).started.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_reference_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut presenter = presenter(MockDownloader::failing(), dir.path(), None).await;
        let block = block(BlockStatus::Success, &["ftp://x/a.png", "https://x/b.png"]);

        let presentation = presenter.present(&block, &settings(dir.path()));
        let ImageBlockView::Images(images) = presentation.view else {
            panic!("expected images");
        };
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].raw, "https://x/b.png");
    }

    #[tokio::test]
    async fn test_teardown_allows_new_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = MockDownloader::gated(b"png".to_vec(), PathBuf::from(dir.path()).join("tmp"));
        let mut presenter = presenter(downloader, dir.path(), Some(BlockId::from("b1"))).await;
        let block = block(BlockStatus::Success, &["https://x/a.png"]);
        let settings = settings(dir.path());

        let first = presenter.present(&block, &settings);
        presenter.teardown();
        for task in first.started {
            assert!(matches!(
                task.outcome().await,
                crate::localize::LocalizeOutcome::Cancelled { .. }
            ));
        }

        assert_eq!(presenter.present(&block, &settings).started.len(), 1);
    }
}
