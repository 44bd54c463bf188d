//! Shared test fixtures: the `avatar` attachment, records carrying it, and
//! real image files on disk.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut record = avatar_record("me.png");
//! submit_crop(&mut record, "thumb", [0, 0, 200, 200]);
//! assert!(record.is_cropping("avatar", "thumb"));
//! ```

use crate::attributes::{CropSuffix, field_name};
use crate::config::StorageConfig;
use crate::record::{CroppableRecord, MemoryRecord};
use crate::types::{Attachment, ORIGINAL_STYLE};
use image::{ImageBuffer, Rgb, RgbImage};
use std::path::{Path, PathBuf};

/// `avatar` with a `thumb` fill style and a `medium` shrink-only style.
pub fn avatar() -> Attachment {
    Attachment::new("avatar")
        .with_style("thumb", "50x50#")
        .with_style("medium", "300x300>")
}

/// A record with [`avatar`] attached as `file_name`.
pub fn avatar_record(file_name: &str) -> MemoryRecord {
    MemoryRecord::new().with_attachment(avatar(), file_name)
}

/// Submit `[x, y, w, h]` for one avatar style through form dispatch.
pub fn submit_crop(record: &mut MemoryRecord, style: &str, rect: [i64; 4]) {
    let fields: Vec<(String, String)> = CropSuffix::RECTANGLE
        .into_iter()
        .zip(rect)
        .map(|(suffix, value)| (field_name("avatar", style, suffix), value.to_string()))
        .collect();
    record.apply_form_fields(fields);
}

/// Filesystem storage rooted at `root`.
pub fn storage_at(root: &Path) -> StorageConfig {
    StorageConfig {
        root: root.to_string_lossy().to_string(),
        ..StorageConfig::default()
    }
}

/// Write a gradient PNG of the given size.
pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save(path).unwrap();
}

/// Write the avatar original for `file_name` into `storage`.
pub fn write_original(storage: &StorageConfig, file_name: &str, width: u32, height: u32) -> PathBuf {
    let path = storage.local_path("avatar", ORIGINAL_STYLE, file_name);
    write_png(&path, width, height);
    path
}
