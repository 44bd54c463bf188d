//! Command planning on top of the pure calculations.
//!
//! [`plan_transformation`] produces the base command a style renders with
//! when no user crop is involved.

use super::backend::Dimensions;
use super::calculations::{calculate_center_offsets, calculate_fill_dimensions};
use crate::geometry::{ResizeModifier, StyleGeometry};

/// Plan the base transformation command for one style.
///
/// Fill styles (`#`) resize to cover the target and then center-crop to it,
/// so the command carries its own `-crop` directive. Every other modifier is
/// a single `-resize`.
///
/// ```text
/// 400x300 source, "50x50#"  → -resize 50x50^ -crop 50x50+8+0 +repage
/// 400x300 source, "300x300>" → -resize 300x300>
/// ```
pub fn plan_transformation(source: Dimensions, geometry: &StyleGeometry) -> Vec<String> {
    let mut tokens = vec!["-resize".to_string(), geometry.resize_arg()];

    let degenerate =
        source.width == 0 || source.height == 0 || geometry.width == 0 || geometry.height == 0;
    if geometry.modifier == ResizeModifier::Fill && !degenerate {
        let target = (geometry.width, geometry.height);
        let scaled = calculate_fill_dimensions((source.width, source.height), target);
        let (ox, oy) = calculate_center_offsets(scaled, target);
        tokens.push("-crop".to_string());
        tokens.push(format!("{}x{}+{}+{}", target.0, target.1, ox, oy));
        tokens.push("+repage".to_string());
    }

    tokens
}
