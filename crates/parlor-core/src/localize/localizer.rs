//! Background download of remote images into local storage.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parlor_media::ImageRef;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::files::{FileRecord, FileStore};
use crate::service::Downloader;
use crate::{Error, Result};

/// A remote image that now has a local copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Localized {
    /// Reference string the localization was requested for.
    pub original: String,
    /// Blob reference of the local copy.
    pub local: ImageRef,
    /// Stored file backing the local copy.
    pub file: FileRecord,
}

/// Result of one localization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalizeOutcome {
    /// The image was stored locally.
    Localized(Localized),
    /// Download or storage produced nothing. Not surfaced to the user.
    Failed {
        /// Reference string the localization was requested for.
        original: String,
        /// Why the attempt failed.
        reason: String,
    },
    /// The owning view went away before the attempt finished.
    Cancelled {
        /// Reference string the localization was requested for.
        original: String,
    },
}

impl LocalizeOutcome {
    /// Reference string the attempt was for.
    #[must_use]
    pub fn original(&self) -> &str {
        match self {
            Self::Localized(localized) => &localized.original,
            Self::Failed { original, .. } | Self::Cancelled { original } => original,
        }
    }
}

/// Hook for instrumenting localization attempts.
///
/// Failures are otherwise silent, so this is the place to count or report them.
pub trait LocalizeObserver: Send + Sync {
    /// Called once per finished attempt, on the worker task.
    fn on_outcome(&self, outcome: &LocalizeOutcome);
}

/// Shared services used by every [`Localizer`].
pub struct LocalizeContext<D: Downloader> {
    downloader: Arc<D>,
    files: Arc<FileStore>,
    runtime: Handle,
    observer: Option<Arc<dyn LocalizeObserver>>,
}

impl<D: Downloader> LocalizeContext<D> {
    /// Creates a context bound to the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a tokio runtime.
    pub fn new(downloader: Arc<D>, files: Arc<FileStore>) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Config(format!("image localization needs a tokio runtime: {e}")))?;

        Ok(Self {
            downloader,
            files,
            runtime,
            observer: None,
        })
    }

    /// Installs an observer for finished attempts.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn LocalizeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// File store the localized images are written to.
    #[must_use]
    pub fn files(&self) -> &Arc<FileStore> {
        &self.files
    }

    async fn fetch_and_store(&self, url: &Url) -> Result<Option<FileRecord>> {
        let downloads = self.downloader.download(std::slice::from_ref(url)).await;
        let Some(download) = downloads.into_iter().next() else {
            return Ok(None);
        };
        self.files.add_download(&download).await.map(Some)
    }
}

/// A running localization attempt.
#[derive(Debug)]
pub struct LocalizeTask {
    original: String,
    handle: JoinHandle<LocalizeOutcome>,
}

impl LocalizeTask {
    /// Reference string the attempt is for.
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Wait for the attempt to finish.
    pub async fn outcome(self) -> LocalizeOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => LocalizeOutcome::Cancelled {
                original: self.original,
            },
            Err(e) => LocalizeOutcome::Failed {
                original: self.original,
                reason: e.to_string(),
            },
        }
    }
}

type InFlight = Arc<Mutex<HashSet<String>>>;

fn lock(set: &InFlight) -> MutexGuard<'_, HashSet<String>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the in-flight marker however the task ends.
struct InFlightGuard {
    set: InFlight,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.set).remove(&self.key);
    }
}

/// Localizes remote images for one view.
///
/// At most one attempt per reference string is in flight at a time. The
/// marker is set synchronously in [`Localizer::localize`], before anything
/// is awaited, and cleared when the attempt ends for any reason.
pub struct Localizer<D: Downloader> {
    context: Arc<LocalizeContext<D>>,
    in_flight: InFlight,
    cancel: CancellationToken,
}

impl<D: Downloader> Localizer<D> {
    /// Creates a localizer with an empty in-flight set.
    #[must_use]
    pub fn new(context: Arc<LocalizeContext<D>>) -> Self {
        Self {
            context,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            cancel: CancellationToken::new(),
        }
    }

    /// Returns true while an attempt for `original` is running.
    #[must_use]
    pub fn is_in_flight(&self, original: &str) -> bool {
        lock(&self.in_flight).contains(original)
    }

    /// Number of running attempts.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Start localizing `url`, keyed by the reference string `original`.
    ///
    /// Returns `None` if an attempt for the same reference is already running.
    #[must_use = "the task reports the local reference to rewrite"]
    pub fn localize(&self, original: &str, url: &Url) -> Option<LocalizeTask> {
        if !lock(&self.in_flight).insert(original.to_string()) {
            tracing::debug!("Localization of {} already in flight", original);
            return None;
        }

        let guard = InFlightGuard {
            set: Arc::clone(&self.in_flight),
            key: original.to_string(),
        };
        let context = Arc::clone(&self.context);
        let token = self.cancel.child_token();
        let key = original.to_string();
        let url = url.clone();

        tracing::debug!("Localizing {}", url);

        let handle = self.context.runtime.spawn(async move {
            let outcome = tokio::select! {
                () = token.cancelled() => LocalizeOutcome::Cancelled { original: key.clone() },
                result = context.fetch_and_store(&url) => match result {
                    Ok(Some(file)) => LocalizeOutcome::Localized(Localized {
                        original: key.clone(),
                        local: ImageRef::blob(file.name.clone()),
                        file,
                    }),
                    Ok(None) => LocalizeOutcome::Failed {
                        original: key.clone(),
                        reason: "download returned nothing".to_string(),
                    },
                    Err(e) => LocalizeOutcome::Failed {
                        original: key.clone(),
                        reason: e.to_string(),
                    },
                },
            };
            drop(guard);

            match &outcome {
                LocalizeOutcome::Localized(localized) => {
                    tracing::debug!("Localized {} as {}", key, localized.local);
                }
                LocalizeOutcome::Failed { reason, .. } => {
                    tracing::debug!("Localization of {} failed: {}", key, reason);
                }
                LocalizeOutcome::Cancelled { .. } => {
                    tracing::debug!("Localization of {} cancelled", key);
                }
            }
            if let Some(observer) = &context.observer {
                observer.on_outcome(&outcome);
            }

            outcome
        });

        Some(LocalizeTask {
            original: original.to_string(),
            handle,
        })
    }

    /// Cancel every running attempt.
    ///
    /// Attempts started afterwards are unaffected.
    pub fn cancel_all(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
    }
}

impl<D: Downloader> Drop for Localizer<D> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::localize::testing::MockDownloader;

    struct CountingObserver(AtomicUsize);

    impl LocalizeObserver for CountingObserver {
        fn on_outcome(&self, _outcome: &LocalizeOutcome) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn context(
        downloader: MockDownloader,
        root: &std::path::Path,
    ) -> Arc<LocalizeContext<MockDownloader>> {
        let files = Arc::new(FileStore::in_memory(root).await.unwrap());
        Arc::new(LocalizeContext::new(Arc::new(downloader), files).unwrap())
    }

    #[tokio::test]
    async fn test_concurrent_requests_fetch_once() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = MockDownloader::gated(b"png".to_vec(), dir.path().join("tmp"));
        let gate = downloader.gate();
        let calls = downloader.calls();
        let localizer = Localizer::new(context(downloader, &dir.path().join("files")).await);
        let url = Url::parse("https://x/img.png").unwrap();

        let first = localizer.localize("https://x/img.png", &url);
        let second = localizer.localize("https://x/img.png", &url);
        assert!(first.is_some());
        assert!(second.is_none());
        assert!(localizer.is_in_flight("https://x/img.png"));

        gate.notify_one();
        let outcome = first.unwrap().outcome().await;

        let LocalizeOutcome::Localized(localized) = outcome else {
            panic!("expected a localized image, got {outcome:?}");
        };
        assert_eq!(localized.original, "https://x/img.png");
        assert_eq!(localized.local.to_string(), format!("http://file/{}", localized.file.name));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(localizer.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_marker_cleared_allows_retry() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = MockDownloader::returning(b"png".to_vec(), dir.path().join("tmp"));
        let calls = downloader.calls();
        let localizer = Localizer::new(context(downloader, &dir.path().join("files")).await);
        let url = Url::parse("https://x/img.png").unwrap();

        let first = localizer.localize(url.as_str(), &url).unwrap();
        assert!(matches!(first.outcome().await, LocalizeOutcome::Localized(_)));

        let second = localizer.localize(url.as_str(), &url).unwrap();
        assert!(matches!(second.outcome().await, LocalizeOutcome::Localized(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_silent_and_clears_marker() {
        let dir = tempfile::tempdir().unwrap();
        let observer = Arc::new(CountingObserver(AtomicUsize::new(0)));
        let files = Arc::new(FileStore::in_memory(dir.path()).await.unwrap());
        let context = LocalizeContext::new(Arc::new(MockDownloader::failing()), files)
            .unwrap()
            .with_observer(observer.clone());
        let localizer = Localizer::new(Arc::new(context));
        let url = Url::parse("https://x/missing.png").unwrap();

        let outcome = localizer
            .localize(url.as_str(), &url)
            .unwrap()
            .outcome()
            .await;

        assert!(matches!(outcome, LocalizeOutcome::Failed { .. }));
        assert_eq!(outcome.original(), "https://x/missing.png");
        assert!(!localizer.is_in_flight(url.as_str()));
        assert_eq!(observer.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_all_stops_running_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = MockDownloader::gated(b"png".to_vec(), dir.path().join("tmp"));
        let mut localizer = Localizer::new(context(downloader, &dir.path().join("files")).await);
        let url = Url::parse("https://x/slow.png").unwrap();

        let task = localizer.localize(url.as_str(), &url).unwrap();
        localizer.cancel_all();

        assert!(matches!(
            task.outcome().await,
            LocalizeOutcome::Cancelled { .. }
        ));
        assert_eq!(localizer.in_flight_count(), 0);
    }

    #[test]
    fn test_context_requires_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let files = runtime
            .block_on(FileStore::in_memory(dir.path()))
            .unwrap();

        let result = LocalizeContext::new(Arc::new(MockDownloader::failing()), Arc::new(files));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
