//! # parlor-core
//!
//! Core logic for the Parlor chat client.
//!
//! This crate provides:
//! - Message and block models with a `SQLite` message store
//! - Content-addressed blob storage for downloaded and generated files
//! - **Image localization** - background download of remote images and
//!   rewriting of block references to the local copies
//! - **Image presentation** - mapping image blocks to display sources
//! - Markdown parsing for text blocks
//! - Clipboard and download byte loading
//! - JSON settings

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod files;
pub mod localize;
pub mod markdown;
pub mod message;
pub mod service;
pub mod settings;

pub use error::{Error, Result};
pub use files::{DownloadedFile, FileRecord, FileStore};
pub use localize::{
    DisplayImage, ImageBlockView, ImagePresenter, LocalizeContext, LocalizeObserver,
    LocalizeOutcome, LocalizeTask, Localized, Localizer, Presentation, apply_localization,
    rewrite_image_reference,
};
pub use markdown::{MarkdownDocument, MarkdownOptions, MarkdownSource};
pub use message::{
    BlockContent, BlockId, BlockStatus, Message, MessageBlock, MessageId, MessageRole,
    MessageStore, StoreEvent, TopicId,
};
pub use service::{Downloader, HttpDownloader, ImagePayload, load_image, save_to_directory};
pub use settings::{MathEngine, Settings};
