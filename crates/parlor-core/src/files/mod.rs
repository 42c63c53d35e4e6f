//! Local blob storage for image attachments.

mod model;
mod repository;

pub use model::{DownloadedFile, FileRecord};
pub use repository::FileStore;
