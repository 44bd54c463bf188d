//! Parameter types for image operations.
//!
//! [`ConvertParams`] describes *what* to run: a source, an output path, and
//! the command tokens. [`Directive`] is the parsed form of those tokens for
//! backends that interpret them instead of delegating to ImageMagick.
//!
//! ## Token vocabulary
//!
//! | Tokens | Directive |
//! |---|---|
//! | `-resize WxH[mod]` | [`Directive::Resize`] |
//! | `-crop WxH+X+Y` | [`Directive::Crop`] |
//! | `+repage` | [`Directive::Repage`] |
//! | `-gravity NAME` | [`Directive::Gravity`] |

use super::backend::BackendError;
use crate::geometry::{ResizeModifier, StyleGeometry};
use crate::types::SourceLocation;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

static CROP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)x(\d+)([+-]\d+)([+-]\d+)$").expect("crop pattern must compile")
});

/// Parameters for a convert operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertParams {
    pub source: SourceLocation,
    pub output: PathBuf,
    pub tokens: Vec<String>,
}

/// One parsed command directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Resize {
        width: u32,
        height: u32,
        modifier: ResizeModifier,
    },
    /// Offsets may be negative; the region is intersected with the image.
    Crop {
        width: u32,
        height: u32,
        x: i64,
        y: i64,
    },
    Repage,
    Gravity(String),
}

/// Parse a crop geometry such as `"100x50+10+20"`.
pub fn parse_crop_geometry(raw: &str) -> Option<(u32, u32, i64, i64)> {
    let caps = CROP_PATTERN.captures(raw)?;
    Some((
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
        caps[4].parse().ok()?,
    ))
}

/// Parse a token command into directives.
///
/// Fails on the first token outside the vocabulary, or on a directive whose
/// argument is missing or malformed.
pub fn parse_directives(tokens: &[String]) -> Result<Vec<Directive>, BackendError> {
    let mut directives = Vec::new();
    let mut iter = tokens.iter();

    while let Some(token) = iter.next() {
        match token.as_str() {
            "-resize" => {
                let arg = expect_arg(&mut iter, token)?;
                let geometry = StyleGeometry::parse(arg).map_err(|_| {
                    BackendError::ProcessingFailed(format!("invalid resize geometry '{arg}'"))
                })?;
                directives.push(Directive::Resize {
                    width: geometry.width,
                    height: geometry.height,
                    modifier: geometry.modifier,
                });
            }
            "-crop" => {
                let arg = expect_arg(&mut iter, token)?;
                let (width, height, x, y) = parse_crop_geometry(arg).ok_or_else(|| {
                    BackendError::ProcessingFailed(format!("invalid crop geometry '{arg}'"))
                })?;
                directives.push(Directive::Crop {
                    width,
                    height,
                    x,
                    y,
                });
            }
            "+repage" => directives.push(Directive::Repage),
            "-gravity" => {
                let arg = expect_arg(&mut iter, token)?;
                directives.push(Directive::Gravity(arg.to_string()));
            }
            other => return Err(BackendError::Unsupported(format!("token '{other}'"))),
        }
    }

    Ok(directives)
}

fn expect_arg<'t>(
    iter: &mut std::slice::Iter<'t, String>,
    directive: &str,
) -> Result<&'t str, BackendError> {
    iter.next()
        .map(String::as_str)
        .ok_or_else(|| BackendError::ProcessingFailed(format!("{directive} requires an argument")))
}
