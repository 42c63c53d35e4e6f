//! Message and block data models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::files::FileRecord;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generates a fresh random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Unique identifier for a conversation topic.
    TopicId
);
string_id!(
    /// Unique identifier for a message.
    MessageId
);
string_id!(
    /// Unique identifier for a message block.
    BlockId
);

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Message written by the user.
    User,
    /// Message produced by the assistant.
    Assistant,
    /// System prompt.
    System,
}

/// A chat message. Content lives in its blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message ID.
    pub id: MessageId,
    /// Topic this message belongs to.
    pub topic_id: TopicId,
    /// Author role.
    pub role: MessageRole,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
    /// When the message was last updated.
    pub updated_at: Option<DateTime<Utc>>,
    /// Ordered block IDs.
    pub block_ids: Vec<BlockId>,
}

impl Message {
    /// Creates an empty message in a topic.
    #[must_use]
    pub fn new(topic_id: TopicId, role: MessageRole) -> Self {
        Self {
            id: MessageId::generate(),
            topic_id,
            role,
            created_at: Utc::now(),
            updated_at: None,
            block_ids: Vec::new(),
        }
    }

    /// Returns a copy with `updated_at` set to now.
    #[must_use]
    pub fn touched(&self) -> Self {
        Self {
            updated_at: Some(Utc::now()),
            ..self.clone()
        }
    }
}

/// Lifecycle status of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    /// Waiting for content.
    Pending,
    /// Request accepted, nothing streamed yet.
    Processing,
    /// Content is arriving.
    Streaming,
    /// Finished successfully.
    Success,
    /// Finished with an error.
    Error,
    /// Stopped by the user.
    Paused,
}

/// Response of an image generation request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenerateImageResponse {
    /// How the images were returned (e.g. "url", "base64").
    #[serde(default)]
    pub kind: String,
    /// Ordered image references.
    #[serde(default)]
    pub images: Vec<String>,
}

/// Metadata attached to an image block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Generated image response, if the block came from image generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_image_response: Option<GenerateImageResponse>,
}

/// Type-specific block payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockContent {
    /// Main Markdown answer text.
    MainText {
        /// Markdown source.
        content: String,
    },
    /// Model reasoning.
    Thinking {
        /// Markdown source.
        content: String,
        /// Time spent thinking in milliseconds.
        #[serde(default)]
        thinking_millis: u64,
    },
    /// Translation of another block.
    Translation {
        /// Markdown source.
        content: String,
        /// Target language code.
        target_language: String,
    },
    /// Image block.
    Image {
        /// Generation metadata.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<ImageMetadata>,
        /// Previously stored file.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file: Option<FileRecord>,
    },
}

/// A unit of message content with its own lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBlock {
    /// Block ID.
    pub id: BlockId,
    /// Owning message.
    pub message_id: MessageId,
    /// Lifecycle status.
    pub status: BlockStatus,
    /// When the block was created.
    pub created_at: DateTime<Utc>,
    /// When the block was last updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Payload.
    #[serde(flatten)]
    pub content: BlockContent,
}

impl MessageBlock {
    /// Creates a block with a fresh ID.
    #[must_use]
    pub fn new(message_id: MessageId, status: BlockStatus, content: BlockContent) -> Self {
        Self {
            id: BlockId::generate(),
            message_id,
            status,
            created_at: Utc::now(),
            updated_at: None,
            content,
        }
    }

    /// Creates a finished main text block.
    #[must_use]
    pub fn main_text(message_id: MessageId, content: impl Into<String>) -> Self {
        Self::new(
            message_id,
            BlockStatus::Success,
            BlockContent::MainText {
                content: content.into(),
            },
        )
    }

    /// Creates an image block holding generated image references.
    #[must_use]
    pub fn generated_images(
        message_id: MessageId,
        status: BlockStatus,
        images: Vec<String>,
    ) -> Self {
        Self::new(
            message_id,
            status,
            BlockContent::Image {
                metadata: Some(ImageMetadata {
                    generate_image_response: Some(GenerateImageResponse {
                        kind: "url".to_string(),
                        images,
                    }),
                }),
                file: None,
            },
        )
    }

    /// Returns the generated image references, if this block carries any list.
    #[must_use]
    pub fn generated_image_refs(&self) -> Option<&[String]> {
        match &self.content {
            BlockContent::Image {
                metadata: Some(metadata),
                ..
            } => metadata
                .generate_image_response
                .as_ref()
                .map(|response| response.images.as_slice()),
            _ => None,
        }
    }

    /// Returns the stored file of an image block.
    #[must_use]
    pub const fn stored_file(&self) -> Option<&FileRecord> {
        match &self.content {
            BlockContent::Image { file, .. } => file.as_ref(),
            _ => None,
        }
    }

    /// Returns the Markdown text of text-like blocks.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            BlockContent::MainText { content }
            | BlockContent::Thinking { content, .. }
            | BlockContent::Translation { content, .. } => Some(content),
            BlockContent::Image { .. } => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_block_json_is_tagged_and_flat() {
        let block = MessageBlock::main_text(MessageId::from("m1"), "hello");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "main_text");
        assert_eq!(json["content"], "hello");
        assert_eq!(json["status"], "success");
        assert_eq!(json["message_id"], "m1");

        let back: MessageBlock = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_generated_image_refs() {
        let block = MessageBlock::generated_images(
            MessageId::from("m1"),
            BlockStatus::Success,
            vec!["https://x/img.png".to_string()],
        );
        assert_eq!(
            block.generated_image_refs(),
            Some(&["https://x/img.png".to_string()][..])
        );
        assert!(block.stored_file().is_none());
        assert!(block.text().is_none());
    }

    #[test]
    fn test_image_block_without_metadata_parses() {
        let json = serde_json::json!({
            "id": "b1",
            "message_id": "m1",
            "status": "pending",
            "created_at": "2026-01-01T00:00:00Z",
            "type": "image"
        });
        let block: MessageBlock = serde_json::from_value(json).unwrap();
        assert_eq!(block.status, BlockStatus::Pending);
        assert!(block.generated_image_refs().is_none());
    }

    #[test]
    fn test_text_of_thinking_block() {
        let block = MessageBlock::new(
            MessageId::from("m1"),
            BlockStatus::Success,
            BlockContent::Thinking {
                content: "Thinking content".to_string(),
                thinking_millis: 5000,
            },
        );
        assert_eq!(block.text(), Some("Thinking content"));
    }

    #[test]
    fn test_message_touched_keeps_identity() {
        let message = Message::new(TopicId::from("t1"), MessageRole::Assistant);
        let touched = message.touched();
        assert_eq!(touched.id, message.id);
        assert!(message.updated_at.is_none());
        assert!(touched.updated_at.is_some());
    }
}
