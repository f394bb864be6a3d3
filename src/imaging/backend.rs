//! Image I/O backend trait and shared types.
//!
//! The compositing core works on decoded buffers only. Reading templates and
//! covers from disk and encoding results goes through [`ImageBackend`], so the
//! batch driver can be tested with an in-memory mock.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) — pure Rust decoders and
//! encoders from the `image` crate.

use super::params::Quality;
use image::{DynamicImage, RgbImage};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for image I/O backends.
///
/// `Sync` so a single backend can be shared across rayon workers.
pub trait ImageBackend: Sync {
    /// Decode an image.
    fn load(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Encode `img` to `path`, format chosen by extension.
    fn save(&self, img: &RgbImage, path: &Path, quality: Quality) -> Result<(), BackendError>;
}
