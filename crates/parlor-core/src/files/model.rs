//! File storage data models.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parlor_media::MediaType;
use serde::{Deserialize, Serialize};

/// A file persisted in the local blob storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Content hash (SHA-256, lowercase hex).
    pub id: String,
    /// Stored file name relative to the storage root (`<id>.<ext>`).
    pub name: String,
    /// Name the file had before it was stored.
    pub origin_name: String,
    /// Extension without the dot.
    pub ext: String,
    /// Size in bytes.
    pub size: u64,
    /// Media type of the content.
    pub media_type: MediaType,
    /// Number of references holding this file.
    pub count: u32,
    /// When the file was first stored.
    pub created_at: DateTime<Utc>,
}

/// A file fetched from the network into a temporary location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Suggested file name.
    pub name: String,
    /// Temporary path of the downloaded bytes.
    pub path: PathBuf,
    /// Media type reported by the server, if any.
    pub media_type: Option<MediaType>,
}
