//! Crop command synthesis.
//!
//! Turns a stored crop rectangle into the pipeline directive
//! `-crop <w>x<h>+<x>+<y>` and splices it into a style's base command.
//!
//! The base command may already carry a `-crop` of its own: fill styles
//! (`"50x50#"`) center-crop after resizing. A user crop replaces that
//! directive instead of stacking on top of it, and it goes first, because
//! the rectangle is expressed in original-image pixels.
//!
//! ```text
//! base:    -resize 50x50^ -crop 50x50+8+0 +repage
//! crop:    200x200+0+0
//! result:  -crop 200x200+0+0 -resize 50x50^ +repage
//! ```

use crate::attributes::{AttrValue, CropAttributes, CropSuffix, field_name};
use crate::state::is_cropping;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{field} must be numeric, got '{value}'")]
    InvalidValue { field: String, value: String },
    #[error("crop {rect} does not fit inside the {original_w}x{original_h} original")]
    OutOfBounds {
        rect: CropRect,
        original_w: i64,
        original_h: i64,
    },
}

/// What to do with a rectangle that leaves the original image.
///
/// Bounds are only known when the record carries `original_w` and
/// `original_h`; without them every policy behaves like `Passthrough`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundsPolicy {
    /// Hand the rectangle to the pipeline unchanged.
    #[default]
    Passthrough,
    /// Fail before rendering.
    Reject,
    /// Intersect with the original image.
    Clamp,
}

/// A crop rectangle in original-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropRect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl CropRect {
    /// Geometry directive, e.g. `"100x50+10+20"`.
    pub fn directive(&self) -> String {
        format!("{}x{}{:+}{:+}", self.w, self.h, self.x, self.y)
    }

    /// True when the rectangle is non-empty and inside `original_w x original_h`.
    ///
    /// An edge past `i64::MAX` does not fit anything.
    pub fn fits(&self, original_w: i64, original_h: i64) -> bool {
        let within = |offset: i64, size: i64, limit: i64| {
            offset.checked_add(size).is_some_and(|end| end <= limit)
        };
        self.w > 0
            && self.h > 0
            && self.x >= 0
            && self.y >= 0
            && within(self.x, self.w, original_w)
            && within(self.y, self.h, original_h)
    }

    /// Intersection with the original frame, `None` if nothing is left.
    pub fn clamp_to(&self, original_w: i64, original_h: i64) -> Option<CropRect> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.x.saturating_add(self.w).min(original_w);
        let y1 = self.y.saturating_add(self.h).min(original_h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(CropRect {
            x: x0,
            y: y0,
            w: x1 - x0,
            h: y1 - y0,
        })
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.directive())
    }
}

fn integer_field(
    store: &CropAttributes,
    attachment: &str,
    style: &str,
    suffix: CropSuffix,
) -> Result<Option<i64>, CommandError> {
    match store.get(attachment, style, suffix) {
        None => Ok(None),
        Some(value) if value.is_blank() => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| CommandError::InvalidValue {
                field: field_name(attachment, style, suffix),
                value: value.to_string(),
            }),
    }
}

/// The stored rectangle for a pair, before any bounds policy.
pub fn crop_rect(
    store: &CropAttributes,
    attachment: &str,
    style: &str,
) -> Result<Option<CropRect>, CommandError> {
    if !is_cropping(store, attachment, style) {
        return Ok(None);
    }
    let field = |suffix| -> Result<i64, CommandError> {
        integer_field(store, attachment, style, suffix)?.ok_or_else(|| {
            CommandError::InvalidValue {
                field: field_name(attachment, style, suffix),
                value: String::new(),
            }
        })
    };
    Ok(Some(CropRect {
        x: field(CropSuffix::CropX)?,
        y: field(CropSuffix::CropY)?,
        w: field(CropSuffix::CropW)?,
        h: field(CropSuffix::CropH)?,
    }))
}

fn original_size(store: &CropAttributes, attachment: &str, style: &str) -> Option<(i64, i64)> {
    let read = |suffix| store.get(attachment, style, suffix).and_then(AttrValue::as_i64);
    Some((read(CropSuffix::OriginalW)?, read(CropSuffix::OriginalH)?))
}

/// The crop to apply to one style, or `None` when the style is not cropping.
///
/// Not cropping is not an error; an unparseable rectangle value and, under
/// [`BoundsPolicy::Reject`], a rectangle outside the original are.
pub fn crop_fragment(
    store: &CropAttributes,
    attachment: &str,
    style: &str,
    policy: BoundsPolicy,
) -> Result<Option<CropRect>, CommandError> {
    let Some(rect) = crop_rect(store, attachment, style)? else {
        return Ok(None);
    };
    if policy == BoundsPolicy::Passthrough {
        return Ok(Some(rect));
    }
    let Some((original_w, original_h)) = original_size(store, attachment, style) else {
        tracing::debug!(attachment, style, "original size unknown, bounds not checked");
        return Ok(Some(rect));
    };
    if rect.fits(original_w, original_h) {
        return Ok(Some(rect));
    }

    let out_of_bounds = CommandError::OutOfBounds {
        rect,
        original_w,
        original_h,
    };
    match policy {
        BoundsPolicy::Clamp => {
            let clamped = rect
                .clamp_to(original_w, original_h)
                .ok_or(out_of_bounds)?;
            tracing::debug!(attachment, style, from = %rect, to = %clamped, "clamped crop");
            Ok(Some(clamped))
        }
        _ => Err(out_of_bounds),
    }
}

/// `["-crop", "<directive>"]`.
pub fn crop_tokens(rect: &CropRect) -> Vec<String> {
    vec!["-crop".to_string(), rect.directive()]
}

/// Splice a user crop into a base pipeline command.
///
/// Without a crop the base command comes back untouched. With one, every
/// `-crop <geometry>` pair in the base is dropped and the user crop is put
/// in front.
pub fn compose(base: Vec<String>, crop: Option<&CropRect>) -> Vec<String> {
    let Some(rect) = crop else {
        return base;
    };

    let mut command = crop_tokens(rect);
    let mut iter = base.into_iter();
    while let Some(token) = iter.next() {
        if token == "-crop" {
            iter.next();
            continue;
        }
        command.push(token);
    }
    command
}
