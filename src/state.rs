//! Crop state evaluation: is a style being cropped, does an attachment have
//! anything pending, and clearing it once applied.
//!
//! A pair is cropping when all four rectangle fields are present and
//! non-blank. Partial submissions are not errors, they simply do not count.

use crate::attributes::{CropAttributes, CropSuffix};
use crate::types::Attachment;

/// True when `crop_x`, `crop_y`, `crop_w` and `crop_h` are all set.
pub fn is_cropping(store: &CropAttributes, attachment: &str, style: &str) -> bool {
    CropSuffix::RECTANGLE.into_iter().all(|suffix| {
        store
            .get(attachment, style, suffix)
            .is_some_and(|value| !value.is_blank())
    })
}

/// Configured styles of `attachment` that currently have a complete rectangle.
pub fn pending_styles<'a>(store: &CropAttributes, attachment: &'a Attachment) -> Vec<&'a str> {
    attachment
        .style_names()
        .filter(|style| is_cropping(store, &attachment.name, style))
        .collect()
}

/// True when at least one configured style is cropping.
pub fn has_pending_crop(store: &CropAttributes, attachment: &Attachment) -> bool {
    attachment
        .style_names()
        .any(|style| is_cropping(store, &attachment.name, style))
}

/// Clear the rectangle fields of every configured style.
///
/// Bookkeeping fields (`original_w`, `box_w`, ...) are left alone. Returns
/// whether anything changed, so a second call returns `false`.
pub fn reset(store: &mut CropAttributes, attachment: &Attachment) -> bool {
    let mut changed = false;
    for style in attachment.style_names() {
        for suffix in CropSuffix::RECTANGLE {
            changed |= store.set(&attachment.name, style, suffix, None);
        }
    }
    changed
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::attributes::AttrValue;
    use proptest::prelude::*;

    fn rect_strategy() -> impl Strategy<Value = [i64; 4]> {
        (0i64..5000, 0i64..5000, 1i64..5000, 1i64..5000).prop_map(|(x, y, w, h)| [x, y, w, h])
    }

    fn name_strategy() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,8}"
    }

    proptest! {
        /// Property: four present values always make a cropping pair.
        #[test]
        fn prop_complete_rect_is_cropping(
            attachment in name_strategy(),
            style in name_strategy(),
            rect in rect_strategy(),
        ) {
            let mut store = CropAttributes::new();
            for (suffix, value) in CropSuffix::RECTANGLE.into_iter().zip(rect) {
                store.set(&attachment, &style, suffix, Some(AttrValue::Integer(value)));
            }
            prop_assert!(is_cropping(&store, &attachment, &style));
        }

        /// Property: removing any one rectangle field breaks completeness.
        #[test]
        fn prop_missing_field_is_not_cropping(
            rect in rect_strategy(),
            missing in 0usize..4,
        ) {
            let mut store = CropAttributes::new();
            for (i, (suffix, value)) in CropSuffix::RECTANGLE.into_iter().zip(rect).enumerate() {
                if i != missing {
                    store.set("avatar", "thumb", suffix, Some(AttrValue::Integer(value)));
                }
            }
            prop_assert!(!is_cropping(&store, "avatar", "thumb"));
        }
    }
}
