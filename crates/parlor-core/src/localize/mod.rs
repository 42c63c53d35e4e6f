//! Image localization.
//!
//! Remote images shown in a conversation are downloaded into the blob store
//! in the background. When a download finishes, the block's reference list is
//! rewritten to point at the local copy and committed back to the store, so
//! later renders no longer depend on the network.

mod localizer;
mod presenter;
mod rewrite;

#[cfg(test)]
pub(crate) mod testing;

pub use localizer::{
    LocalizeContext, LocalizeObserver, LocalizeOutcome, LocalizeTask, Localized, Localizer,
};
pub use presenter::{DisplayImage, ImageBlockView, ImagePresenter, Presentation, display_references};
pub use rewrite::{apply_localization, rewrite_image_reference};
