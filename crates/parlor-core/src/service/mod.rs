//! Services that talk to the outside world.
//!
//! This module provides the network downloader used by image localization
//! and the byte loading behind clipboard copy and downloads.

pub mod download;
pub mod transfer;

pub use download::{Downloader, HttpDownloader};
pub use transfer::{ImagePayload, load_image, save_to_directory};
