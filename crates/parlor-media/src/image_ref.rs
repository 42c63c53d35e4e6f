//! Image reference classification.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::data_uri::DataUri;
use crate::error::{Error, Result};

/// Prefix of references to blobs in the local file storage.
pub const BLOB_PREFIX: &str = "http://file/";

/// Prefix of absolute local file references.
pub const FILE_PREFIX: &str = "file://";

/// A reference to image bytes.
///
/// Stored references are plain strings; the form is decided once by
/// [`ImageRef::parse`] and carried as a variant from then on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Self-contained base64 payload.
    Embedded(DataUri),
    /// Blob name resolved against the file storage root.
    Blob {
        /// Stored file name (e.g. `3f2a...c1.png`).
        name: String,
    },
    /// Absolute path on the local filesystem.
    File {
        /// Path to the image file.
        path: PathBuf,
    },
    /// Network location.
    Remote {
        /// Image URL.
        url: Url,
    },
}

impl ImageRef {
    /// Classifies a stored reference string.
    ///
    /// `http://file/` is checked before the generic `http` schemes, so a blob
    /// reference is never treated as remote. Blob names may contain
    /// subdirectories but no empty, `.` or `..` segments.
    ///
    /// Surrounding whitespace is ignored for classification only. Callers
    /// that match references against stored lists keep the string as written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] for malformed `http(s)` references and
    /// [`Error::UnsupportedReference`] for anything that matches no form.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.starts_with("data:") {
            return Ok(Self::Embedded(DataUri::new(s)));
        }

        if let Some(name) = s.strip_prefix(BLOB_PREFIX) {
            if !is_blob_name(name) {
                return Err(Error::UnsupportedReference(s.to_string()));
            }
            return Ok(Self::Blob {
                name: name.to_string(),
            });
        }

        if let Some(path) = s.strip_prefix(FILE_PREFIX) {
            if path.is_empty() {
                return Err(Error::UnsupportedReference(s.to_string()));
            }
            return Ok(Self::File {
                path: PathBuf::from(path),
            });
        }

        if s.starts_with("http://") || s.starts_with("https://") {
            let url = Url::parse(s)?;
            return Ok(Self::Remote { url });
        }

        Err(Error::UnsupportedReference(s.to_string()))
    }

    /// Creates a blob reference.
    #[must_use]
    pub fn blob(name: impl Into<String>) -> Self {
        Self::Blob { name: name.into() }
    }

    /// Resolves a blob reference to a file under `storage_root`.
    ///
    /// Other forms are returned unchanged.
    #[must_use]
    pub fn resolve(&self, storage_root: impl AsRef<Path>) -> Self {
        match self {
            Self::Blob { name } => Self::File {
                path: storage_root.as_ref().join(name),
            },
            other => other.clone(),
        }
    }

    /// Returns true for network references.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Returns true for blob and file references.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Blob { .. } | Self::File { .. })
    }

    /// Returns the URL of a remote reference.
    #[must_use]
    pub const fn as_url(&self) -> Option<&Url> {
        match self {
            Self::Remote { url } => Some(url),
            _ => None,
        }
    }

    /// Suggests a file name for saving this image.
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        match self {
            Self::Embedded(_) => None,
            Self::Blob { name } => Some(name.clone()),
            Self::File { path } => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(ToString::to_string),
            Self::Remote { url } => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|segment| !segment.is_empty())
                .map(ToString::to_string),
        }
    }
}

/// Relative path inside the storage root that cannot escape it.
fn is_blob_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .split(['/', '\\'])
            .all(|segment| !matches!(segment, "" | "." | ".."))
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded(uri) => write!(f, "{uri}"),
            Self::Blob { name } => write!(f, "{BLOB_PREFIX}{name}"),
            Self::File { path } => write!(f, "{FILE_PREFIX}{}", path.display()),
            Self::Remote { url } => f.write_str(url.as_str()),
        }
    }
}

impl std::str::FromStr for ImageRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ImageRef {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ImageRef {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_embedded() {
        let r = ImageRef::parse("data:image/png;base64,SGVsbG8=").unwrap();
        assert!(matches!(r, ImageRef::Embedded(_)));
        assert!(!r.is_remote());
        assert!(!r.is_local());
    }

    #[test]
    fn test_malformed_embedded_still_classifies() {
        let r = ImageRef::parse("data:garbage").unwrap();
        let ImageRef::Embedded(uri) = r else {
            panic!("expected embedded reference");
        };
        assert!(uri.decode().is_err());
    }

    #[test]
    fn test_blob_prefix_wins_over_http() {
        let r = ImageRef::parse("http://file/abc.png").unwrap();
        assert_eq!(r, ImageRef::blob("abc.png"));
        assert!(r.is_local());
        assert!(!r.is_remote());
    }

    #[test]
    fn test_parse_file() {
        let r = ImageRef::parse("file:///data/Files/abc.png").unwrap();
        assert_eq!(
            r,
            ImageRef::File {
                path: PathBuf::from("/data/Files/abc.png")
            }
        );
        assert_eq!(r.to_string(), "file:///data/Files/abc.png");
    }

    #[test]
    fn test_parse_remote() {
        let r = ImageRef::parse("https://x/img.png").unwrap();
        assert!(r.is_remote());
        assert_eq!(r.as_url().unwrap().host_str(), Some("x"));
        assert_eq!(r.to_string(), "https://x/img.png");
        assert_eq!(r.file_name().as_deref(), Some("img.png"));
    }

    #[test]
    fn test_parse_rejects_unknown_forms() {
        assert!(matches!(
            ImageRef::parse("img.png"),
            Err(Error::UnsupportedReference(_))
        ));
        assert!(matches!(
            ImageRef::parse("ftp://x/img.png"),
            Err(Error::UnsupportedReference(_))
        ));
        assert!(matches!(
            ImageRef::parse("http://file/"),
            Err(Error::UnsupportedReference(_))
        ));
        assert!(matches!(
            ImageRef::parse("https://"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_nested_blob_names() {
        let r = ImageRef::parse("http://file/sub/x.png").unwrap();
        assert_eq!(r, ImageRef::blob("sub/x.png"));
        assert_eq!(r.resolve("/data/Files").to_string(), "file:///data/Files/sub/x.png");

        for escaping in [
            "http://file/../x.png",
            "http://file/sub/../../x.png",
            "http://file//x.png",
            "http://file/sub/",
            "http://file/./x.png",
            "http://file/..\\x.png",
        ] {
            assert!(
                matches!(ImageRef::parse(escaping), Err(Error::UnsupportedReference(_))),
                "{escaping} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_ignores_surrounding_whitespace() {
        assert_eq!(
            ImageRef::parse("  https://x/img.png\n").unwrap().to_string(),
            "https://x/img.png"
        );
    }

    #[test]
    fn test_resolve_blob() {
        let r = ImageRef::blob("abc.png").resolve("/data/Files");
        assert_eq!(r.to_string(), "file:///data/Files/abc.png");
    }

    #[test]
    fn test_resolve_leaves_remote_alone() {
        let r = ImageRef::parse("https://x/img.png").unwrap();
        assert_eq!(r.resolve("/data/Files"), r);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            ImageRef::blob("abc.png").file_name().as_deref(),
            Some("abc.png")
        );
        assert_eq!(
            ImageRef::parse("https://x/").unwrap().file_name(),
            None
        );
        assert_eq!(
            ImageRef::parse("data:image/png;base64,AA==")
                .unwrap()
                .file_name(),
            None
        );
    }

    proptest! {
        #[test]
        fn prop_parse_never_panics(s in "\\PC*") {
            let _ = ImageRef::parse(&s);
        }

        #[test]
        fn prop_blob_display_round_trips(name in "[a-z0-9]{1,24}\\.(png|jpg|webp)") {
            let reference = ImageRef::blob(name.clone());
            let parsed = ImageRef::parse(&reference.to_string()).unwrap();
            prop_assert_eq!(parsed, ImageRef::Blob { name });
        }

        #[test]
        fn prop_resolved_blob_is_never_remote(name in "[a-z0-9]{1,24}\\.png") {
            let resolved = ImageRef::blob(name).resolve("/srv/files");
            prop_assert!(resolved.is_local());
            prop_assert!(!resolved.is_remote());
        }
    }
}
