//! Media type handling.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Known image extensions and their media types.
const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("png", "png"),
    ("jpg", "jpeg"),
    ("jpeg", "jpeg"),
    ("gif", "gif"),
    ("webp", "webp"),
    ("svg", "svg+xml"),
    ("bmp", "bmp"),
    ("ico", "x-icon"),
    ("avif", "avif"),
    ("tif", "tiff"),
    ("tiff", "tiff"),
];

/// Media type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// Main type (e.g., "image", "application").
    pub main_type: String,
    /// Subtype (e.g., "png", "jpeg", "octet-stream").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8).
    pub parameters: BTreeMap<String, String>,
}

impl MediaType {
    /// Creates a new media type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Creates an image/png media type.
    #[must_use]
    pub fn image_png() -> Self {
        Self::new("image", "png")
    }

    /// Creates the application/octet-stream fallback type.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Guesses the media type from a file extension (without the dot).
    ///
    /// Unknown extensions map to `application/octet-stream`.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        IMAGE_EXTENSIONS
            .iter()
            .find(|(known, _)| *known == ext)
            .map_or_else(Self::octet_stream, |(_, sub)| Self::new("image", *sub))
    }

    /// Guesses the media type from a path or URL path.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or_else(Self::octet_stream, Self::from_extension)
    }

    /// Returns the preferred file extension for this type, if it is a known image.
    #[must_use]
    pub fn extension(&self) -> Option<&'static str> {
        if !self.is_image() {
            return None;
        }
        IMAGE_EXTENSIONS
            .iter()
            .find(|(_, sub)| sub.eq_ignore_ascii_case(&self.sub_type))
            .map(|(ext, _)| *ext)
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks if this is an image media type.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("image")
    }

    /// Parses a media type string.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    ///
    /// # Errors
    ///
    /// Returns an error if the format is invalid.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(';');

        let type_str = parts
            .next()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidMediaType("Empty media type".to_string()))?;

        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::InvalidMediaType(format!("Missing subtype in {type_str}")))?;

        let main_type = main_type.trim().to_lowercase();
        let sub_type = sub_type.trim().to_lowercase();
        if main_type.is_empty() || sub_type.is_empty() {
            return Err(Error::InvalidMediaType(type_str.to_string()));
        }

        let mut media_type = Self::new(main_type, sub_type);

        for param in parts {
            let param = param.trim();
            if let Some((key, value)) = param.split_once('=') {
                let key = key.trim().to_lowercase();
                let value = value.trim().trim_matches('"').to_string();
                media_type.parameters.insert(key, value);
            }
        }

        Ok(media_type)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        for (key, value) in &self.parameters {
            if value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c)) {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for MediaType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for MediaType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
