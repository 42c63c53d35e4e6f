//! Content-addressed file storage.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parlor_media::MediaType;
use sha2::{Digest, Sha256};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use super::model::{DownloadedFile, FileRecord};
use crate::{Error, Result};

/// Extension used when nothing better is known.
const FALLBACK_EXT: &str = "bin";

/// Blob store backed by a directory and a `SQLite` index.
///
/// Files are named after the SHA-256 of their content, so storing the same
/// bytes twice reuses the existing file and bumps its reference count.
pub struct FileStore {
    root: PathBuf,
    pool: SqlitePool,
}

impl FileStore {
    /// Create a new store rooted at `root`, indexed in the given database.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database fails.
    pub async fn new(root: impl Into<PathBuf>, database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Self::with_pool(root.into(), pool).await
    }

    /// Create a store with an in-memory index for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database fails.
    pub async fn in_memory(root: impl Into<PathBuf>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(root.into(), pool).await
    }

    async fn with_pool(root: PathBuf, pool: SqlitePool) -> Result<Self> {
        tokio::fs::create_dir_all(&root).await?;
        let store = Self { root, pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS files (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                origin_name TEXT NOT NULL DEFAULT '',
                ext TEXT NOT NULL,
                size INTEGER NOT NULL,
                media_type TEXT NOT NULL,
                count INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Storage root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a stored file.
    #[must_use]
    pub fn path_for(&self, record: &FileRecord) -> PathBuf {
        self.root.join(&record.name)
    }

    /// Store raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the file or the index fails.
    pub async fn add_bytes(
        &self,
        bytes: &[u8],
        origin_name: &str,
        media_type: &MediaType,
    ) -> Result<FileRecord> {
        let id = format!("{:x}", Sha256::digest(bytes));
        let ext = media_type
            .extension()
            .map(ToString::to_string)
            .or_else(|| {
                Path::new(origin_name)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase)
            })
            .unwrap_or_else(|| FALLBACK_EXT.to_string());
        let name = format!("{id}.{ext}");
        let path = self.root.join(&name);

        if !tokio::fs::try_exists(&path).await? {
            self.write_blob(&path, &name, bytes).await?;
        }

        sqlx::query(
            r"
            INSERT INTO files (id, name, origin_name, ext, size, media_type, count, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 1, ?)
            ON CONFLICT(id) DO UPDATE SET count = count + 1
            ",
        )
        .bind(&id)
        .bind(&name)
        .bind(origin_name)
        .bind(&ext)
        .bind(i64::try_from(bytes.len()).unwrap_or(i64::MAX))
        .bind(media_type.essence())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!("Stored {} ({} bytes) as {}", origin_name, bytes.len(), name);

        self.get(&id)
            .await?
            .ok_or_else(|| Error::FileNotFound(id))
    }

    /// Write a blob through a uniquely named partial file.
    ///
    /// A crash never leaves a truncated blob under its final name, and
    /// concurrent writers of the same content each use their own partial file.
    /// Losing the rename race to an identical blob counts as success.
    async fn write_blob(&self, path: &Path, name: &str, bytes: &[u8]) -> Result<()> {
        let partial = self
            .root
            .join(format!(".{name}.{}.part", uuid::Uuid::new_v4()));
        tokio::fs::write(&partial, bytes).await?;

        if let Err(e) = tokio::fs::rename(&partial, path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            if !tokio::fs::try_exists(path).await? {
                return Err(e.into());
            }
            tracing::debug!("Blob {} was stored concurrently", name);
        }
        Ok(())
    }

    /// Move a downloaded file into storage.
    ///
    /// The temporary file is removed afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the download cannot be read or stored.
    pub async fn add_download(&self, file: &DownloadedFile) -> Result<FileRecord> {
        let bytes = tokio::fs::read(&file.path).await?;
        let media_type = file
            .media_type
            .clone()
            .filter(MediaType::is_image)
            .unwrap_or_else(|| MediaType::from_path(&file.name));

        let record = self.add_bytes(&bytes, &file.name, &media_type).await?;

        if let Err(e) = tokio::fs::remove_file(&file.path).await {
            tracing::debug!("Could not remove temporary file {:?}: {}", file.path, e);
        }

        Ok(record)
    }

    /// Get a stored file by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: &str) -> Result<Option<FileRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, name, origin_name, ext, size, media_type, count, created_at
            FROM files WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|row| record_from_row(&row)))
    }
}

fn record_from_row(row: &SqliteRow) -> Option<FileRecord> {
    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .ok()?
        .with_timezone(&Utc);
    let media_type: String = row.get("media_type");

    Some(FileRecord {
        id: row.get("id"),
        name: row.get("name"),
        origin_name: row.get("origin_name"),
        ext: row.get("ext"),
        size: u64::try_from(row.get::<i64, _>("size")).unwrap_or(0),
        media_type: MediaType::parse(&media_type).unwrap_or_else(|_| MediaType::octet_stream()),
        count: u32::try_from(row.get::<i64, _>("count")).unwrap_or(0),
        created_at,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_bytes_is_content_addressed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_memory(dir.path()).await.unwrap();

        let record = store
            .add_bytes(b"png bytes", "cat.png", &MediaType::image_png())
            .await
            .unwrap();

        assert_eq!(record.id.len(), 64);
        assert_eq!(record.name, format!("{}.png", record.id));
        assert_eq!(record.size, 9);
        assert_eq!(record.count, 1);
        assert_eq!(
            tokio::fs::read(store.path_for(&record)).await.unwrap(),
            b"png bytes"
        );
        assert_eq!(store.path_for(&record), dir.path().join(&record.name));
    }

    #[tokio::test]
    async fn test_same_bytes_share_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_memory(dir.path()).await.unwrap();

        let first = store
            .add_bytes(b"same", "a.png", &MediaType::image_png())
            .await
            .unwrap();
        let second = store
            .add_bytes(b"same", "b.png", &MediaType::image_png())
            .await
            .unwrap();

        assert_eq!(first.name, second.name);
        assert_eq!(second.count, 2);
        assert_eq!(second.origin_name, "a.png");
    }

    #[tokio::test]
    async fn test_extension_falls_back_to_origin_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_memory(dir.path()).await.unwrap();

        let record = store
            .add_bytes(b"x", "notes.TXT", &MediaType::octet_stream())
            .await
            .unwrap();
        assert_eq!(record.ext, "txt");

        let record = store
            .add_bytes(b"y", "noext", &MediaType::octet_stream())
            .await
            .unwrap();
        assert_eq!(record.ext, "bin");
    }

    #[tokio::test]
    async fn test_add_download_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let store = FileStore::in_memory(dir.path()).await.unwrap();

        let temp_path = temp.path().join("img.jpg");
        tokio::fs::write(&temp_path, b"jpeg").await.unwrap();

        let record = store
            .add_download(&DownloadedFile {
                name: "img.jpg".to_string(),
                path: temp_path.clone(),
                media_type: None,
            })
            .await
            .unwrap();

        assert_eq!(record.media_type.essence(), "image/jpeg");
        assert_eq!(record.ext, "jpg");
        assert!(!temp_path.exists());
        assert!(store.path_for(&record).exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_adds_of_same_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_memory(dir.path()).await.unwrap();
        let bytes = vec![7u8; 4 * 1024 * 1024];

        for _ in 0..10 {
            let png = MediaType::image_png();
            let (first, second) = tokio::join!(
                store.add_bytes(&bytes, "a.png", &png),
                store.add_bytes(&bytes, "b.png", &png),
            );
            let first = first.unwrap();
            let second = second.unwrap();
            assert_eq!(first.name, second.name);
            assert_eq!(
                tokio::fs::read(store.path_for(&first)).await.unwrap().len(),
                bytes.len()
            );
        }

        let record = store
            .get(&format!("{:x}", Sha256::digest(&bytes)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.count, 20);

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec![record.name]);
    }
}
