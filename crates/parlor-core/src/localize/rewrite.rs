//! Replacing image references inside stored blocks.

use chrono::Utc;

use super::localizer::Localized;
use crate::Result;
use crate::message::{BlockContent, BlockId, MessageBlock, MessageStore};

/// Returns a copy of `block` with every occurrence of `original` in its
/// generated image list replaced by `replacement`.
///
/// Blocks without a generated image list come back unchanged, including
/// their timestamp. Otherwise `updated_at` is refreshed.
#[must_use]
pub fn rewrite_image_reference(
    block: &MessageBlock,
    original: &str,
    replacement: &str,
) -> MessageBlock {
    let mut updated = block.clone();

    let BlockContent::Image {
        metadata: Some(metadata),
        ..
    } = &mut updated.content
    else {
        return updated;
    };
    let Some(response) = metadata.generate_image_response.as_mut() else {
        return updated;
    };

    for image in &mut response.images {
        if image == original {
            replacement.clone_into(image);
        }
    }
    updated.updated_at = Some(Utc::now());

    updated
}

/// Write a finished localization back into the store.
///
/// The rewrite is applied to the block as currently stored, under the store's
/// write lock, so localizations of several images in one block that finish
/// together all survive. Returns false when the block has no image list or no
/// longer contains the original reference.
///
/// # Errors
///
/// Returns an error if the block or its message is missing or the commit fails.
pub async fn apply_localization(
    store: &MessageStore,
    block_id: &BlockId,
    localized: &Localized,
) -> Result<bool> {
    let replacement = localized.local.to_string();

    let updated = store
        .update_block(block_id, |block| {
            let images = block.generated_image_refs()?;
            if !images.iter().any(|image| *image == localized.original) {
                tracing::debug!(
                    "Block {} no longer references {}",
                    block_id,
                    localized.original
                );
                return None;
            }
            Some(rewrite_image_reference(
                block,
                &localized.original,
                &replacement,
            ))
        })
        .await?;

    if updated.is_some() {
        tracing::info!(
            "Replaced {} with {} in block {}",
            localized.original,
            localized.local,
            block_id
        );
    }
    Ok(updated.is_some())
}
