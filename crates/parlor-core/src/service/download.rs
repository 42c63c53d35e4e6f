//! Network fetch of remote images.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use parlor_media::MediaType;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::files::DownloadedFile;
use crate::{Error, Result};

/// Largest response accepted for a single image.
const MAX_DOWNLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Request timeout for image downloads.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Fetches remote locations into temporary files.
///
/// Failures are not reported as errors: a location that could not be fetched
/// is simply missing from the result.
pub trait Downloader: Send + Sync + 'static {
    /// Download each URL, returning the files that succeeded.
    fn download(&self, urls: &[Url]) -> impl Future<Output = Vec<DownloadedFile>> + Send;
}

/// HTTP downloader backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
    temp_dir: PathBuf,
}

impl HttpDownloader {
    /// Creates a downloader writing into `temp_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(temp_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(concat!("parlor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            temp_dir: temp_dir.into(),
        })
    }

    /// Creates a downloader sharing an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            temp_dir: temp_dir.into(),
        }
    }

    async fn fetch_one(&self, url: &Url) -> Result<DownloadedFile> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;

        if let Some(length) = response.content_length()
            && length > MAX_DOWNLOAD_BYTES
        {
            return Err(Error::Download(format!("{url} is {length} bytes")));
        }

        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| MediaType::parse(value).ok());

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(Error::Download(format!("{url} returned no content")));
        }

        let name = suggested_name(url, media_type.as_ref());
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let path = self
            .temp_dir
            .join(format!("{}-{name}", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, &bytes).await?;

        Ok(DownloadedFile {
            name,
            path,
            media_type,
        })
    }
}

impl Downloader for HttpDownloader {
    async fn download(&self, urls: &[Url]) -> Vec<DownloadedFile> {
        let mut files = Vec::with_capacity(urls.len());
        for url in urls {
            match self.fetch_one(url).await {
                Ok(file) => files.push(file),
                Err(e) => tracing::warn!("Failed to download {}: {}", url, e),
            }
        }
        files
    }
}

/// Builds a file name from the URL's last path segment, adding an extension
/// from the media type when the segment has none.
fn suggested_name(url: &Url, media_type: Option<&MediaType>) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("image");

    let has_ext = std::path::Path::new(segment).extension().is_some();
    match media_type.and_then(MediaType::extension) {
        Some(ext) if !has_ext => format!("{segment}.{ext}"),
        _ => segment.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_suggested_name_keeps_extension() {
        let url = Url::parse("https://x/a/img.png?sig=1").unwrap();
        assert_eq!(suggested_name(&url, None), "img.png");
    }

    #[test]
    fn test_suggested_name_adds_extension_from_media_type() {
        let url = Url::parse("https://x/render/12345").unwrap();
        let jpeg = MediaType::new("image", "jpeg");
        assert_eq!(suggested_name(&url, Some(&jpeg)), "12345.jpg");
    }

    #[test]
    fn test_suggested_name_for_bare_host() {
        let url = Url::parse("https://x/").unwrap();
        assert_eq!(suggested_name(&url, None), "image");
        assert_eq!(
            suggested_name(&url, Some(&MediaType::image_png())),
            "image.png"
        );
    }

    #[tokio::test]
    async fn test_unreachable_url_yields_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = HttpDownloader::new(dir.path()).unwrap();
        // Port 9 on localhost is the discard service; nothing listens there in CI.
        let url = Url::parse("http://127.0.0.1:9/img.png").unwrap();

        let files = downloader.download(&[url]).await;
        assert!(files.is_empty());
    }
}
