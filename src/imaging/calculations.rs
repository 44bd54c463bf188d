//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate dimensions that fit inside a target box while maintaining the
/// source aspect ratio. One dimension matches the box, the other is smaller
/// or equal.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Bounding box dimensions (width, height)
pub fn calculate_fit_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: width will match, height shrinks
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round().max(1.0) as u32;
        (w, h)
    } else {
        // Source is taller: height will match, width shrinks
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round().max(1.0) as u32;
        (w, h)
    }
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Fill dimensions (at least one matches target)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w, h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h)
    }
}

/// Offsets that center a `target` window inside `scaled` dimensions.
pub fn calculate_center_offsets(scaled: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    (
        scaled.0.saturating_sub(target.0) / 2,
        scaled.1.saturating_sub(target.1) / 2,
    )
}

/// Intersect a crop region with an image of `bounds` size.
///
/// Returns `(x, y, width, height)` of the visible part, or `None` when the
/// region misses the image entirely.
pub fn intersect_crop(
    bounds: (u32, u32),
    region: (u32, u32, i64, i64),
) -> Option<(u32, u32, u32, u32)> {
    let (img_w, img_h) = (bounds.0 as i64, bounds.1 as i64);
    let (w, h, x, y) = (region.0 as i64, region.1 as i64, region.2, region.3);

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = x.saturating_add(w).min(img_w);
    let y1 = y.saturating_add(h).min(img_h);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
}
