//! Chat messages and their content blocks.
//!
//! A message is an ordered list of blocks; each block carries its own
//! lifecycle status and a type-specific payload.

mod model;
mod repository;

pub use model::{
    BlockContent, BlockId, BlockStatus, GenerateImageResponse, ImageMetadata, Message,
    MessageBlock, MessageId, MessageRole, TopicId,
};
pub use repository::{MessageStore, StoreEvent};
