//! # parlor-media
//!
//! Image reference handling for the Parlor chat client.
//!
//! ## Features
//!
//! - **Image references**: Classify a stored image string once into an
//!   embedded payload, a local blob, a local file or a remote URL
//! - **Data URIs**: Parse and decode `data:image/...;base64,...` payloads
//! - **Media types**: Parse media types and map file extensions to them
//! - **Encoding**: Base64 helpers
//!
//! ## Quick Start
//!
//! ### Classifying references
//!
//! ```ignore
//! use parlor_media::ImageRef;
//!
//! let reference = ImageRef::parse("http://file/abc.png")?;
//! assert!(reference.is_local());
//!
//! let shown = reference.resolve("/home/me/.local/share/parlor/Files");
//! println!("{shown}"); // file:///home/me/.local/share/parlor/Files/abc.png
//! ```
//!
//! ### Decoding embedded images
//!
//! ```ignore
//! use parlor_media::DataUri;
//!
//! let uri = DataUri::new("data:image/png;base64,iVBORw0KGgo=");
//! let (media_type, bytes) = uri.decode()?;
//! assert_eq!(media_type.to_string(), "image/png");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod data_uri;
mod error;
mod image_ref;
mod media_type;

pub mod encoding;

pub use data_uri::DataUri;
pub use error::{Error, Result};
pub use image_ref::{BLOB_PREFIX, FILE_PREFIX, ImageRef};
pub use media_type::MediaType;
