//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the pipeline needs:
//! identify (read pixel dimensions) and convert (run a token command from a
//! source to an output file).
//!
//! Two implementations ship with the crate:
//! [`RustBackend`](super::rust_backend::RustBackend), which interprets the
//! token subset the planner emits using the `image` crate, and
//! [`MagickBackend`](super::magick_backend::MagickBackend), which hands the
//! tokens to ImageMagick verbatim.

use super::params::ConvertParams;
use crate::types::SourceLocation;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Unsupported by this backend: {0}")]
    Unsupported(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Calls are blocking. Backends are used from one request at a time, so no
/// `Sync` bound is required.
pub trait ImageBackend {
    /// Get image dimensions.
    fn identify(&self, source: &SourceLocation) -> Result<Dimensions, BackendError>;

    /// Run `params.tokens` against the source and write the output file.
    fn convert(&self, params: &ConvertParams) -> Result<(), BackendError>;
}
