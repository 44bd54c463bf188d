//! Pure Rust image processing backend.
//!
//! Interprets the token vocabulary from [`params`](super::params) instead of
//! delegating to an external program.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` (header only, no full decode) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` |
//! | `-resize` | `DynamicImage::resize_exact` with `Lanczos3` |
//! | `-crop` | `DynamicImage::crop_imm`, region intersected with the image |
//! | Encode | `DynamicImage::save`, format from the output extension |
//!
//! Remote sources are not fetched; use
//! [`MagickBackend`](super::magick_backend::MagickBackend) for URL storage.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{calculate_fill_dimensions, calculate_fit_dimensions, intersect_crop};
use super::params::{ConvertParams, Directive, parse_directives};
use crate::geometry::ResizeModifier;
use crate::types::SourceLocation;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::path::Path;

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn local_path(source: &SourceLocation) -> Result<&Path, BackendError> {
    match source {
        SourceLocation::Path(p) => Ok(p),
        SourceLocation::Url(u) => Err(BackendError::Unsupported(format!(
            "remote source {u}; the rust backend only reads local files"
        ))),
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Target size for a resize directive, or `None` when the modifier says the
/// image stays as it is.
fn resize_target(
    current: (u32, u32),
    target: (u32, u32),
    modifier: ResizeModifier,
) -> Option<(u32, u32)> {
    let exceeds = current.0 > target.0 || current.1 > target.1;
    let within = current.0 < target.0 && current.1 < target.1;
    match modifier {
        ResizeModifier::Fit => Some(calculate_fit_dimensions(current, target)),
        ResizeModifier::ShrinkOnly if exceeds => Some(calculate_fit_dimensions(current, target)),
        ResizeModifier::EnlargeOnly if within => Some(calculate_fit_dimensions(current, target)),
        ResizeModifier::ShrinkOnly | ResizeModifier::EnlargeOnly => None,
        ResizeModifier::Exact => Some(target),
        ResizeModifier::Fill | ResizeModifier::Minimum => {
            Some(calculate_fill_dimensions(current, target))
        }
    }
}

fn apply(img: DynamicImage, directive: &Directive) -> Result<DynamicImage, BackendError> {
    match directive {
        Directive::Resize {
            width,
            height,
            modifier,
        } => {
            if *width == 0 || *height == 0 {
                return Err(BackendError::ProcessingFailed(format!(
                    "cannot resize to {width}x{height}"
                )));
            }
            let current = (img.width(), img.height());
            match resize_target(current, (*width, *height), *modifier) {
                Some((w, h)) if (w, h) != current => {
                    Ok(img.resize_exact(w, h, FilterType::Lanczos3))
                }
                _ => Ok(img),
            }
        }
        Directive::Crop {
            width,
            height,
            x,
            y,
        } => {
            let (cx, cy, cw, ch) =
                intersect_crop((img.width(), img.height()), (*width, *height, *x, *y))
                    .ok_or_else(|| {
                        BackendError::ProcessingFailed(format!(
                            "crop {width}x{height}{x:+}{y:+} lies outside a {}x{} image",
                            img.width(),
                            img.height()
                        ))
                    })?;
            Ok(img.crop_imm(cx, cy, cw, ch))
        }
        // Crops here never keep a virtual canvas, and offsets are always explicit.
        Directive::Repage => Ok(img),
        Directive::Gravity(name) => {
            tracing::debug!(gravity = %name, "gravity ignored; crop offsets are absolute");
            Ok(img)
        }
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, source: &SourceLocation) -> Result<Dimensions, BackendError> {
        let path = local_path(source)?;
        if !path.exists() {
            return Err(BackendError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )));
        }
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn convert(&self, params: &ConvertParams) -> Result<(), BackendError> {
        let directives = parse_directives(&params.tokens)?;
        let mut img = load_image(local_path(&params.source)?)?;
        for directive in &directives {
            img = apply(img, directive)?;
        }

        if let Some(parent) = params.output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        img.save(&params.output).map_err(|e| {
            BackendError::ProcessingFailed(format!(
                "Failed to encode {}: {}",
                params.output.display(),
                e
            ))
        })
    }
}
