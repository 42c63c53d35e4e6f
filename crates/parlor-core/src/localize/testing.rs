//! Scripted downloader for unit tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;
use url::Url;

use crate::files::DownloadedFile;
use crate::service::Downloader;

pub(crate) struct MockDownloader {
    calls: Arc<AtomicUsize>,
    payload: Option<Vec<u8>>,
    gate: Option<Arc<Notify>>,
    temp_dir: PathBuf,
}

impl MockDownloader {
    /// Serves `payload` for every URL.
    pub(crate) fn returning(payload: Vec<u8>, temp_dir: PathBuf) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            payload: Some(payload),
            gate: None,
            temp_dir,
        }
    }

    /// Serves `payload` once the gate is notified.
    pub(crate) fn gated(payload: Vec<u8>, temp_dir: PathBuf) -> Self {
        Self {
            gate: Some(Arc::new(Notify::new())),
            ..Self::returning(payload, temp_dir)
        }
    }

    /// Never produces a file.
    pub(crate) fn failing() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            payload: None,
            gate: None,
            temp_dir: std::env::temp_dir(),
        }
    }

    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub(crate) fn gate(&self) -> Arc<Notify> {
        self.gate.clone().unwrap_or_else(|| Arc::new(Notify::new()))
    }
}

impl Downloader for MockDownloader {
    async fn download(&self, urls: &[Url]) -> Vec<DownloadedFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let Some(payload) = &self.payload else {
            return Vec::new();
        };

        let mut files = Vec::new();
        for url in urls {
            let name = url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or("image.png")
                .to_string();
            let path = self.temp_dir.join(format!("{}-{name}", uuid::Uuid::new_v4()));
            if tokio::fs::create_dir_all(&self.temp_dir).await.is_err()
                || tokio::fs::write(&path, payload).await.is_err()
            {
                continue;
            }
            files.push(DownloadedFile {
                name,
                path,
                media_type: None,
            });
        }
        files
    }
}
