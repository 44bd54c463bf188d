//! Data for the crop preview and crop editor widgets.
//!
//! Templates live with the host application; this module computes what they
//! need (sizes, element ids, hidden field names and values) and nothing
//! else. Both widgets serialize to JSON.
//!
//! ```text
//! preview   avatar__thumb_crop_preview_wrapper   50x50 clipping frame
//!             └ avatar__thumb_crop_preview       original image, width 100%
//!
//! cropbox   hidden: original_w original_h box_w
//!           hidden: crop_x crop_y crop_w crop_h  (ids, filled by the client)
//!           hidden: aspect                       (id, style width / height)
//!           avatar__thumb_cropbox                original image
//! ```

use crate::attributes::{CropSuffix, field_name};
use crate::geometry::{GeometryError, GeometryResolver, aspect_for_style, dimensions_for_style};
use crate::imaging::ImageBackend;
use crate::types::{Attachment, ORIGINAL_STYLE};
use serde::Serialize;

/// Clipping frame sized like the style, showing the live crop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewWidget {
    pub wrapper_id: String,
    pub image_id: String,
    pub width: f64,
    pub height: f64,
    pub image_src: String,
}

/// One hidden form input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HiddenField {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// The crop editor: the original image plus the fields the client fills in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropboxWidget {
    pub container_id: String,
    pub image_src: String,
    pub original_w: u32,
    pub original_h: u32,
    pub box_w: u32,
    pub aspect: f64,
    pub fields: Vec<HiddenField>,
}

fn element_id(attachment: &str, style: &str, part: &str) -> String {
    format!("{attachment}__{style}_{part}")
}

/// Preview widget for one style. Reads declared geometry only.
pub fn preview<B: ImageBackend>(
    resolver: &GeometryResolver<'_, B>,
    attachment: &Attachment,
    style: &str,
    file_name: &str,
) -> Result<PreviewWidget, GeometryError> {
    let (width, height) = dimensions_for_style(attachment, style)?;
    Ok(PreviewWidget {
        wrapper_id: element_id(&attachment.name, style, "crop_preview_wrapper"),
        image_id: element_id(&attachment.name, style, "crop_preview"),
        width,
        height,
        image_src: resolver
            .storage()
            .locate(&attachment.name, ORIGINAL_STYLE, file_name)
            .to_string(),
    })
}

/// Crop editor widget for one style.
///
/// `box_width` is the on-screen width of the editor; it defaults to the
/// original's width (no scaling).
pub fn cropbox<B: ImageBackend>(
    resolver: &GeometryResolver<'_, B>,
    attachment: &Attachment,
    style: &str,
    file_name: &str,
    box_width: Option<u32>,
) -> Result<CropboxWidget, GeometryError> {
    let aspect = aspect_for_style(attachment, style)?;
    let original = resolver.original_geometry(attachment, file_name)?;
    let box_w = box_width.unwrap_or(original.width);
    let name = |suffix| field_name(&attachment.name, style, suffix);

    let mut fields = vec![
        HiddenField {
            name: name(CropSuffix::OriginalW),
            id: None,
            value: Some(original.width.to_string()),
        },
        HiddenField {
            name: name(CropSuffix::OriginalH),
            id: None,
            value: Some(original.height.to_string()),
        },
        HiddenField {
            name: name(CropSuffix::BoxW),
            id: None,
            value: Some(box_w.to_string()),
        },
    ];
    fields.extend(CropSuffix::RECTANGLE.into_iter().map(|suffix| HiddenField {
        name: name(suffix),
        id: Some(name(suffix)),
        value: None,
    }));
    fields.push(HiddenField {
        name: name(CropSuffix::Aspect),
        id: Some(name(CropSuffix::Aspect)),
        value: Some(aspect.to_string()),
    });

    Ok(CropboxWidget {
        container_id: element_id(&attachment.name, style, "cropbox"),
        image_src: resolver
            .storage()
            .locate(&attachment.name, ORIGINAL_STYLE, file_name)
            .to_string(),
        original_w: original.width,
        original_h: original.height,
        box_w,
        aspect,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::imaging::Dimensions;
    use crate::imaging::backend::tests::MockBackend;

    fn avatar() -> Attachment {
        Attachment::new("avatar")
            .with_style("thumb", "50x50#")
            .with_style("wide", "160x90")
            .with_style("broken", "100x0")
    }

    #[test]
    fn preview_uses_declared_size() {
        let storage = StorageConfig::default();
        let backend = MockBackend::new();
        let resolver = GeometryResolver::new(&backend, &storage);

        let widget = preview(&resolver, &avatar(), "wide", "me.png").unwrap();

        assert_eq!(widget.wrapper_id, "avatar__wide_crop_preview_wrapper");
        assert_eq!(widget.image_id, "avatar__wide_crop_preview");
        assert_eq!((widget.width, widget.height), (160.0, 90.0));
        assert_eq!(widget.image_src, "public/system/avatar/original/me.png");
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn cropbox_fields_in_order() {
        let storage = StorageConfig::default();
        let backend = MockBackend::with_dimensions(vec![Dimensions { width: 800, height: 600 }]);
        let resolver = GeometryResolver::new(&backend, &storage);

        let widget = cropbox(&resolver, &avatar(), "thumb", "me.png", None).unwrap();

        let names: Vec<&str> = widget.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "avatar__thumb_original_w",
                "avatar__thumb_original_h",
                "avatar__thumb_box_w",
                "avatar__thumb_crop_x",
                "avatar__thumb_crop_y",
                "avatar__thumb_crop_w",
                "avatar__thumb_crop_h",
                "avatar__thumb_aspect",
            ]
        );
        assert_eq!(widget.container_id, "avatar__thumb_cropbox");
        assert_eq!(widget.box_w, 800);
        assert_eq!(widget.fields[2].value.as_deref(), Some("800"));
        assert_eq!(widget.fields[3].id.as_deref(), Some("avatar__thumb_crop_x"));
        assert!(widget.fields[3].value.is_none());
        assert_eq!(widget.aspect, 1.0);
    }

    #[test]
    fn cropbox_explicit_width() {
        let storage = StorageConfig::default();
        let backend = MockBackend::with_dimensions(vec![Dimensions { width: 800, height: 600 }]);
        let resolver = GeometryResolver::new(&backend, &storage);

        let widget = cropbox(&resolver, &avatar(), "wide", "me.png", Some(650)).unwrap();
        assert_eq!(widget.box_w, 650);
        assert!((widget.aspect - 16.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn cropbox_zero_height_style() {
        let storage = StorageConfig::default();
        let backend = MockBackend::with_dimensions(vec![Dimensions { width: 800, height: 600 }]);
        let resolver = GeometryResolver::new(&backend, &storage);

        let result = cropbox(&resolver, &avatar(), "broken", "me.png", None);
        assert!(matches!(result, Err(GeometryError::DivisionUndefined(_))));
    }

    #[test]
    fn cropbox_missing_original() {
        let storage = StorageConfig::default();
        let backend = MockBackend::new();
        let resolver = GeometryResolver::new(&backend, &storage);

        let result = cropbox(&resolver, &avatar(), "thumb", "me.png", None);
        assert!(matches!(result, Err(GeometryError::Unavailable { .. })));
    }

    #[test]
    fn widget_serializes_without_empty_values() {
        let storage = StorageConfig::default();
        let backend = MockBackend::with_dimensions(vec![Dimensions { width: 10, height: 10 }]);
        let resolver = GeometryResolver::new(&backend, &storage);

        let widget = cropbox(&resolver, &avatar(), "thumb", "me.png", None).unwrap();
        let json = serde_json::to_value(&widget).unwrap();
        assert!(json["fields"][0].get("id").is_none());
        assert!(json["fields"][3].get("value").is_none());
    }
}
