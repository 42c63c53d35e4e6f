//! Raw image bytes for clipboard copy and downloads.

use std::path::{Path, PathBuf};

use parlor_media::{ImageRef, MediaType};
use reqwest::header::CONTENT_TYPE;
use tokio::io::AsyncWriteExt;

use crate::{Error, Result};

/// Highest numeric suffix tried before giving up on a free file name.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Image bytes with their media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// Media type of the bytes.
    pub media_type: MediaType,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
    /// Name to save the image under.
    pub file_name: String,
}

/// Obtain the bytes behind a display source.
///
/// Embedded payloads are base64-decoded, local references are read from disk
/// (blob names resolve against `storage_root`), remote URLs are fetched.
///
/// # Errors
///
/// Returns an error for malformed embedded payloads, unreadable files and
/// failed or non-success HTTP responses.
pub async fn load_image(
    source: &ImageRef,
    storage_root: &Path,
    http: &reqwest::Client,
) -> Result<ImagePayload> {
    match source.resolve(storage_root) {
        ImageRef::Embedded(uri) => {
            let (media_type, bytes) = uri.decode()?;
            let ext = media_type.extension().unwrap_or("png");
            Ok(ImagePayload {
                media_type,
                bytes,
                file_name: format!("image.{ext}"),
            })
        }
        ImageRef::File { path } => {
            let bytes = tokio::fs::read(&path).await?;
            Ok(ImagePayload {
                media_type: MediaType::from_path(&path),
                bytes,
                file_name: file_name_or_default(source),
            })
        }
        ImageRef::Remote { url } => {
            let response = http.get(url.clone()).send().await?.error_for_status()?;
            let media_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| MediaType::parse(value).ok())
                .unwrap_or_else(|| MediaType::from_path(url.path()));
            let bytes = response.bytes().await?.to_vec();
            if bytes.is_empty() {
                return Err(Error::Download(format!("{url} returned no content")));
            }
            Ok(ImagePayload {
                media_type,
                bytes,
                file_name: file_name_or_default(source),
            })
        }
        ImageRef::Blob { name } => Err(Error::FileNotFound(name)),
    }
}

/// Save a payload into `dir` without overwriting existing files.
///
/// `photo.png` becomes `photo (1).png`, `photo (2).png`, ... when taken.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub async fn save_to_directory(payload: &ImagePayload, dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let base = Path::new(&payload.file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("image");
    let base_path = Path::new(base);
    let stem = base_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let ext = base_path
        .extension()
        .and_then(|e| e.to_str())
        .map(ToString::to_string)
        .or_else(|| payload.media_type.extension().map(ToString::to_string));

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = match (attempt, ext.as_deref()) {
            (0, Some(ext)) => format!("{stem}.{ext}"),
            (0, None) => stem.to_string(),
            (n, Some(ext)) => format!("{stem} ({n}).{ext}"),
            (n, None) => format!("{stem} ({n})"),
        };
        let path = dir.join(name);

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                file.write_all(&payload.bytes).await?;
                file.flush().await?;
                tracing::info!("Saved image to {:?}", path);
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }
    }

    Err(Error::Config(format!(
        "no free file name for {base} in {}",
        dir.display()
    )))
}

fn file_name_or_default(source: &ImageRef) -> String {
    source.file_name().unwrap_or_else(|| "image".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_embedded() {
        let source = ImageRef::parse("data:image/png;base64,SGVsbG8=").unwrap();
        let payload = load_image(&source, Path::new("/nowhere"), &reqwest::Client::new())
            .await
            .unwrap();
        assert_eq!(payload.media_type.essence(), "image/png");
        assert_eq!(payload.bytes, b"Hello");
        assert_eq!(payload.file_name, "image.png");
    }

    #[tokio::test]
    async fn test_load_malformed_embedded_fails() {
        let source = ImageRef::parse("data:image/png,SGVsbG8=").unwrap();
        let result = load_image(&source, Path::new("/nowhere"), &reqwest::Client::new()).await;
        assert!(matches!(
            result,
            Err(Error::Media(parlor_media::Error::InvalidDataUri(_)))
        ));
    }

    #[tokio::test]
    async fn test_load_blob_reads_from_storage_root() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("abc.gif"), b"GIF89a")
            .await
            .unwrap();

        let payload = load_image(
            &ImageRef::blob("abc.gif"),
            dir.path(),
            &reqwest::Client::new(),
        )
        .await
        .unwrap();
        assert_eq!(payload.media_type.essence(), "image/gif");
        assert_eq!(payload.bytes, b"GIF89a");
        assert_eq!(payload.file_name, "abc.gif");
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let source = ImageRef::parse("file:///definitely/not/here.png").unwrap();
        let result = load_image(&source, Path::new("/"), &reqwest::Client::new()).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_save_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let payload = ImagePayload {
            media_type: MediaType::image_png(),
            bytes: b"one".to_vec(),
            file_name: "photo.png".to_string(),
        };

        let first = save_to_directory(&payload, dir.path()).await.unwrap();
        let second = save_to_directory(&payload, dir.path()).await.unwrap();

        assert_eq!(first.file_name().unwrap(), "photo.png");
        assert_eq!(second.file_name().unwrap(), "photo (1).png");
        assert_eq!(tokio::fs::read(second).await.unwrap(), b"one");
    }

    #[tokio::test]
    async fn test_save_strips_directories_and_adds_extension() {
        let dir = tempfile::tempdir().unwrap();
        let payload = ImagePayload {
            media_type: MediaType::new("image", "jpeg"),
            bytes: b"x".to_vec(),
            file_name: "../../etc/render".to_string(),
        };

        let path = save_to_directory(&payload, dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("render.jpg"));
    }
}
