//! End-to-end crop flow through the public API: config, form dispatch, the
//! post-update hook, and real renders with the pure Rust backend.

use image::{ImageBuffer, Rgb, RgbImage};
use std::path::Path;
use stylecrop::config::{self, StorageConfig};
use stylecrop::imaging::{ImagePipeline, RustBackend};
use stylecrop::record::{CroppableRecord, MemoryRecord};
use stylecrop::reprocess::{ReprocessCoordinator, ReprocessOutcome, ReprocessState};
use stylecrop::types::{Attachment, ORIGINAL_STYLE};
use tempfile::TempDir;

fn write_png(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 200])
    });
    img.save(path).unwrap();
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("stylecrop.toml");
    let root = dir.join("system");
    std::fs::write(
        &path,
        format!(
            r#"
[storage]
root = "{}"

[attachments.avatar.styles]
thumb = "50x50#"
medium = "300x300>"
"#,
            root.display()
        ),
    )
    .unwrap();
    path
}

fn thumb_crop() -> [(&'static str, &'static str); 5] {
    [
        ("avatar__thumb_crop_x", "0"),
        ("avatar__thumb_crop_y", "0"),
        ("avatar__thumb_crop_w", "200"),
        ("avatar__thumb_crop_h", "200"),
        ("title", "Me"),
    ]
}

#[test]
fn avatar_thumb_crop_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let config = config::load_config(&write_config(tmp.path())).unwrap();
    let avatar = config.attachment("avatar").unwrap();
    write_png(
        &config.storage.local_path("avatar", ORIGINAL_STYLE, "me.png"),
        800,
        600,
    );

    let mut record = MemoryRecord::new().with_attachment(avatar, "me.png");
    let form = record.apply_form_fields(thumb_crop());
    assert_eq!(form.applied.len(), 4);
    assert_eq!(form.unrecognized, vec!["title"]);
    assert!(record.has_pending_crop("avatar"));

    let backend = RustBackend::new();
    let pipeline = ImagePipeline::new(&backend, &config.storage).unwrap();
    let mut coordinator = ReprocessCoordinator::new(&pipeline, config.cropping.bounds);

    let outcome = coordinator.after_update(&mut record, "avatar").unwrap();
    let ReprocessOutcome::Reprocessed(renders) = outcome else {
        panic!("expected a reprocess");
    };

    // Config styles are listed by name.
    let medium = &renders[0];
    let thumb = &renders[1];
    assert_eq!(medium.style, "medium");
    assert!(!medium.tokens.iter().any(|t| t == "-crop"));
    assert_eq!(thumb.style, "thumb");
    assert_eq!(&thumb.tokens[..2], ["-crop", "200x200+0+0"]);
    assert_eq!(thumb.tokens.iter().filter(|t| *t == "-crop").count(), 1);

    let stored_thumb = config.storage.local_path("avatar", "thumb", "me.png");
    let stored_medium = config.storage.local_path("avatar", "medium", "me.png");
    assert_eq!(image::image_dimensions(&stored_thumb).unwrap(), (50, 50));
    assert_eq!(image::image_dimensions(&stored_medium).unwrap(), (300, 225));

    assert_eq!(coordinator.state(), ReprocessState::Idle);
    assert!(!record.has_pending_crop("avatar"));
    assert!(record.updated_at.is_some());

    let again = coordinator.after_update(&mut record, "avatar").unwrap();
    assert_eq!(again, ReprocessOutcome::Skipped);
}

#[test]
fn missing_original_keeps_crop_for_retry() {
    let tmp = TempDir::new().unwrap();
    let config = config::load_config(&write_config(tmp.path())).unwrap();
    let avatar = config.attachment("avatar").unwrap();

    let mut record = MemoryRecord::new().with_attachment(avatar, "me.png");
    record.apply_form_fields(thumb_crop());

    let backend = RustBackend::new();
    let pipeline = ImagePipeline::new(&backend, &config.storage).unwrap();
    let mut coordinator = ReprocessCoordinator::new(&pipeline, config.cropping.bounds);

    assert!(coordinator.after_update(&mut record, "avatar").is_err());
    assert_eq!(coordinator.state(), ReprocessState::Failed);
    assert!(record.is_cropping("avatar", "thumb"));

    // Upload arrives; a fresh pipeline (new request) succeeds with the same crop.
    write_png(
        &config.storage.local_path("avatar", ORIGINAL_STYLE, "me.png"),
        400,
        400,
    );
    let pipeline = ImagePipeline::new(&backend, &config.storage).unwrap();
    let mut coordinator = ReprocessCoordinator::new(&pipeline, config.cropping.bounds);
    assert!(matches!(
        coordinator.after_update(&mut record, "avatar"),
        Ok(ReprocessOutcome::Reprocessed(_))
    ));
    assert!(!record.is_cropping("avatar", "thumb"));
}

#[test]
fn reset_is_idempotent_through_record() {
    let mut record = MemoryRecord::new().with_attachment(
        Attachment::new("avatar")
            .with_style("thumb", "50x50#")
            .with_style("medium", "300x300>"),
        "me.png",
    );
    record.apply_form_fields(thumb_crop());
    record.apply_form_fields([
        ("avatar__medium_crop_x", "5"),
        ("avatar__medium_crop_y", "5"),
        ("avatar__medium_crop_w", "100"),
        ("avatar__medium_crop_h", "100"),
    ]);

    assert!(record.reset_crop_attributes_of("avatar"));
    let after_first = record.crop_attributes().clone();
    assert!(!record.reset_crop_attributes_of("avatar"));
    assert_eq!(record.crop_attributes(), &after_first);
    assert!(!record.is_cropping("avatar", "thumb"));
    assert!(!record.is_cropping("avatar", "medium"));
}

#[test]
fn remote_storage_needs_a_url_capable_backend() {
    let storage = StorageConfig {
        mode: config::StorageMode::Remote,
        base_url: Some("https://cdn.test/system".into()),
        ..StorageConfig::default()
    };
    let mut record = MemoryRecord::new().with_attachment(
        Attachment::new("avatar").with_style("thumb", "50x50#"),
        "me.png",
    );
    record.apply_form_fields(thumb_crop());

    let backend = RustBackend::new();
    let pipeline = ImagePipeline::new(&backend, &storage).unwrap();
    let mut coordinator = ReprocessCoordinator::new(&pipeline, Default::default());

    // The rust backend cannot read URLs, so the pass fails before persisting.
    assert!(coordinator.after_update(&mut record, "avatar").is_err());
    assert!(record.is_cropping("avatar", "thumb"));
}
