//! Embedded image payloads (`data:` URIs).

use std::fmt;

use crate::encoding::{decode_base64, encode_base64};
use crate::error::{Error, Result};
use crate::media_type::MediaType;

/// An embedded image payload.
///
/// The raw string is kept as stored; the payload is only validated when
/// [`DataUri::decode`] is called, so a malformed URI still classifies as
/// embedded and fails at the point where its bytes are needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    raw: String,
}

impl DataUri {
    /// Wraps a raw `data:` string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Builds a data URI from bytes.
    #[must_use]
    pub fn from_bytes(media_type: &MediaType, bytes: &[u8]) -> Self {
        Self {
            raw: format!("data:{};base64,{}", media_type.essence(), encode_base64(bytes)),
        }
    }

    /// Returns the raw string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the declared media type without decoding the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI does not have the `data:image/<type>;base64,` shape.
    pub fn media_type(&self) -> Result<MediaType> {
        self.split().map(|(media_type, _)| media_type)
    }

    /// Decodes the payload.
    ///
    /// Only `data:image/<word>;base64,<data>` is accepted, where `<word>`
    /// consists of ASCII letters, digits and underscores.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDataUri`] if the shape does not match, or a
    /// base64 error if the payload cannot be decoded.
    pub fn decode(&self) -> Result<(MediaType, Vec<u8>)> {
        let (media_type, payload) = self.split()?;
        let bytes = decode_base64(payload)?;
        Ok((media_type, bytes))
    }

    fn split(&self) -> Result<(MediaType, &str)> {
        let invalid = || Error::InvalidDataUri(truncate(&self.raw));

        let rest = self.raw.strip_prefix("data:").ok_or_else(invalid)?;
        let (header, payload) = rest.split_once(',').ok_or_else(invalid)?;
        let sub_type = header
            .strip_suffix(";base64")
            .and_then(|mt| mt.strip_prefix("image/"))
            .ok_or_else(invalid)?;

        let is_word = !sub_type.is_empty()
            && sub_type
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !is_word || payload.is_empty() {
            return Err(invalid());
        }

        Ok((MediaType::new("image", sub_type.to_ascii_lowercase()), payload))
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Shortens long payloads for error messages.
fn truncate(raw: &str) -> String {
    const MAX: usize = 48;
    match raw.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_png() {
        let uri = DataUri::new("data:image/png;base64,SGVsbG8=");
        let (media_type, bytes) = uri.decode().unwrap();
        assert_eq!(media_type.essence(), "image/png");
        assert_eq!(bytes, b"Hello");
    }

    #[test]
    fn test_from_bytes_round_trip() {
        let uri = DataUri::from_bytes(&MediaType::new("image", "jpeg"), b"\xff\xd8\xff");
        assert!(uri.as_str().starts_with("data:image/jpeg;base64,"));
        assert_eq!(uri.decode().unwrap().1, b"\xff\xd8\xff");
    }

    #[test]
    fn test_rejects_non_image() {
        let uri = DataUri::new("data:text/plain;base64,SGVsbG8=");
        assert!(matches!(uri.decode(), Err(Error::InvalidDataUri(_))));
    }

    #[test]
    fn test_rejects_missing_base64_marker() {
        let uri = DataUri::new("data:image/png,SGVsbG8=");
        assert!(matches!(uri.decode(), Err(Error::InvalidDataUri(_))));
    }

    #[test]
    fn test_rejects_compound_subtype() {
        let uri = DataUri::new("data:image/svg+xml;base64,PHN2Zz4=");
        assert!(matches!(uri.media_type(), Err(Error::InvalidDataUri(_))));
    }

    #[test]
    fn test_rejects_empty_payload() {
        let uri = DataUri::new("data:image/png;base64,");
        assert!(uri.decode().is_err());
    }

    #[test]
    fn test_bad_base64_is_decode_error() {
        let uri = DataUri::new("data:image/png;base64,@@@");
        assert!(matches!(uri.decode(), Err(Error::Base64Decode(_))));
    }

    #[test]
    fn test_error_message_is_truncated() {
        let long = format!("data:text/plain;base64,{}", "A".repeat(500));
        let err = DataUri::new(long).decode().unwrap_err();
        assert!(err.to_string().len() < 120);
    }
}
