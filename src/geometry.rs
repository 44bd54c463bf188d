//! Style geometry parsing and stored-image geometry resolution.
//!
//! Two kinds of geometry flow through the crate:
//!
//! - **Declared geometry**: the `"WxH"` string configured for a style,
//!   optionally suffixed by a resize modifier (`"50x50#"`). Parsed by
//!   [`StyleGeometry::parse`]; no I/O.
//! - **Image geometry**: the actual pixel size of a stored rendition, read
//!   through the [`ImageBackend`]. Resolved by [`GeometryResolver`], which
//!   memoizes per `(attachment, style)` for the lifetime of one request.
//!
//! ## Modifiers
//!
//! | Suffix | Meaning |
//! |---|---|
//! | *(none)* | fit inside `WxH`, preserving aspect |
//! | `#` | fill `WxH`, then center-crop to exactly `WxH` |
//! | `>` | shrink only |
//! | `<` | enlarge only |
//! | `!` | exact size, aspect ignored |
//! | `^` | cover `WxH` (minimum size), no crop |

use crate::config::StorageConfig;
use crate::imaging::{BackendError, Dimensions, ImageBackend};
use crate::types::{Attachment, ORIGINAL_STYLE};
use regex::Regex;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

static DIMENSIONS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)x(\d+)").expect("dimensions pattern must compile"));

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("geometry unavailable for {attachment}/{style}: {source}")]
    Unavailable {
        attachment: String,
        style: String,
        #[source]
        source: BackendError,
    },
    #[error("aspect ratio undefined for geometry '{0}': height is zero")]
    DivisionUndefined(String),
    #[error("malformed geometry '{0}': expected WxH")]
    Malformed(String),
    #[error("style '{style}' is not configured on attachment '{attachment}'")]
    UnknownStyle { attachment: String, style: String },
}

/// How a style's declared size is applied when resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeModifier {
    Fit,
    Fill,
    ShrinkOnly,
    EnlargeOnly,
    Exact,
    Minimum,
}

impl ResizeModifier {
    fn from_suffix(c: char) -> Option<Self> {
        match c {
            '#' => Some(Self::Fill),
            '>' => Some(Self::ShrinkOnly),
            '<' => Some(Self::EnlargeOnly),
            '!' => Some(Self::Exact),
            '^' => Some(Self::Minimum),
            _ => None,
        }
    }

    /// Flag appended to a `-resize` argument. `Fill` resizes like `Minimum`;
    /// the crop half of the operation is a separate directive.
    pub fn resize_flag(self) -> &'static str {
        match self {
            Self::Fit => "",
            Self::Fill | Self::Minimum => "^",
            Self::ShrinkOnly => ">",
            Self::EnlargeOnly => "<",
            Self::Exact => "!",
        }
    }
}

/// A parsed declared geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleGeometry {
    pub width: u32,
    pub height: u32,
    pub modifier: ResizeModifier,
}

impl StyleGeometry {
    /// Parse `"WxH"` with an optional trailing modifier.
    ///
    /// Only the first `WxH` match counts; anything else in the string other
    /// than a recognized trailing modifier is ignored.
    pub fn parse(raw: &str) -> Result<Self, GeometryError> {
        let (width, height) =
            parse_dimensions(raw).ok_or_else(|| GeometryError::Malformed(raw.to_string()))?;
        let modifier = raw
            .trim()
            .chars()
            .last()
            .and_then(ResizeModifier::from_suffix)
            .unwrap_or(ResizeModifier::Fit);
        Ok(Self {
            width,
            height,
            modifier,
        })
    }

    /// Declared size as floats, the unit the crop widgets work in.
    pub fn dimensions(&self) -> (f64, f64) {
        (self.width as f64, self.height as f64)
    }

    /// `width / height`, used to constrain the client-side crop box.
    pub fn aspect(&self) -> Result<f64, GeometryError> {
        if self.height == 0 {
            return Err(GeometryError::DivisionUndefined(format!(
                "{}x{}",
                self.width, self.height
            )));
        }
        Ok(self.width as f64 / self.height as f64)
    }

    /// Argument for a `-resize` directive, e.g. `"50x50^"`.
    pub fn resize_arg(&self) -> String {
        format!(
            "{}x{}{}",
            self.width,
            self.height,
            self.modifier.resize_flag()
        )
    }
}

/// Extract the first `WxH` pair from a string.
///
/// Returns `None` when there is no match or a number overflows `u32`.
pub fn parse_dimensions(raw: &str) -> Option<(u32, u32)> {
    let caps = DIMENSIONS_PATTERN.captures(raw)?;
    let w = caps[1].parse().ok()?;
    let h = caps[2].parse().ok()?;
    Some((w, h))
}

/// Style name → raw declared geometry, in the attachment's style order.
pub fn styles(attachment: &Attachment) -> Vec<(&str, &str)> {
    attachment
        .styles
        .iter()
        .map(|s| (s.name.as_str(), s.geometry.as_str()))
        .collect()
}

/// Parse the declared geometry of one configured style.
pub fn style_geometry(attachment: &Attachment, style: &str) -> Result<StyleGeometry, GeometryError> {
    let declared = attachment
        .style(style)
        .ok_or_else(|| GeometryError::UnknownStyle {
            attachment: attachment.name.clone(),
            style: style.to_string(),
        })?;
    StyleGeometry::parse(&declared.geometry)
}

/// Declared `(width, height)` of a style as floats.
pub fn dimensions_for_style(
    attachment: &Attachment,
    style: &str,
) -> Result<(f64, f64), GeometryError> {
    Ok(style_geometry(attachment, style)?.dimensions())
}

/// Declared aspect ratio of a style.
pub fn aspect_for_style(attachment: &Attachment, style: &str) -> Result<f64, GeometryError> {
    style_geometry(attachment, style)?.aspect()
}

/// Resolves the pixel size of stored renditions through a backend.
///
/// Scoped to one request: lookups are memoized per `(attachment, style)` and
/// never invalidated, so a resolver must not outlive a reprocessing pass that
/// rewrites the files it has already measured.
pub struct GeometryResolver<'a, B: ImageBackend> {
    backend: &'a B,
    storage: &'a StorageConfig,
    memo: RefCell<HashMap<(String, String), Dimensions>>,
}

impl<'a, B: ImageBackend> GeometryResolver<'a, B> {
    pub fn new(backend: &'a B, storage: &'a StorageConfig) -> Self {
        Self {
            backend,
            storage,
            memo: RefCell::new(HashMap::new()),
        }
    }

    pub fn storage(&self) -> &'a StorageConfig {
        self.storage
    }

    /// Pixel size of `file_name` as stored for `style` (or [`ORIGINAL_STYLE`]).
    pub fn image_geometry(
        &self,
        attachment: &Attachment,
        style: &str,
        file_name: &str,
    ) -> Result<Dimensions, GeometryError> {
        if style != ORIGINAL_STYLE && attachment.style(style).is_none() {
            return Err(GeometryError::UnknownStyle {
                attachment: attachment.name.clone(),
                style: style.to_string(),
            });
        }

        let key = (attachment.name.clone(), style.to_string());
        if let Some(dims) = self.memo.borrow().get(&key) {
            return Ok(*dims);
        }

        let location = self.storage.locate(&attachment.name, style, file_name);
        let dims = self
            .backend
            .identify(&location)
            .map_err(|source| GeometryError::Unavailable {
                attachment: attachment.name.clone(),
                style: style.to_string(),
                source,
            })?;
        tracing::debug!(
            attachment = %attachment.name,
            style,
            %location,
            width = dims.width,
            height = dims.height,
            "resolved image geometry"
        );
        self.memo.borrow_mut().insert(key, dims);
        Ok(dims)
    }

    /// Shorthand for the geometry of the untouched upload.
    pub fn original_geometry(
        &self,
        attachment: &Attachment,
        file_name: &str,
    ) -> Result<Dimensions, GeometryError> {
        self.image_geometry(attachment, ORIGINAL_STYLE, file_name)
    }
}
