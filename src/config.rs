//! Configuration module.
//!
//! Handles loading, validating, and merging `stylecrop.toml`. Stock defaults
//! are serialized to a TOML value and the user file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! [storage]
//! mode = "filesystem"          # "filesystem" or "remote"
//! root = "public/system"       # where renditions live on disk
//! # base_url = "https://cdn.example.com/system"   # required for remote
//!
//! [cropping]
//! bounds = "passthrough"       # passthrough | reject | clamp
//!
//! [attachments.avatar.styles]
//! thumb = "50x50#"
//! medium = "300x300>"
//! ```
//!
//! Unknown keys are rejected to catch typos early. Styles of a configured
//! attachment are listed by name.

use crate::command::BoundsPolicy;
use crate::geometry::StyleGeometry;
use crate::types::{Attachment, SourceLocation, Style};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file name looked up when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "stylecrop.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration loaded from `stylecrop.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropConfig {
    /// Where stored renditions are read from and written to.
    pub storage: StorageConfig,
    /// Crop handling policy.
    pub cropping: CroppingConfig,
    /// Attachment name → its style definitions.
    pub attachments: BTreeMap<String, AttachmentConfig>,
}

/// Per-attachment settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttachmentConfig {
    /// Style name → declared geometry (`"WxH"` plus optional modifier).
    pub styles: BTreeMap<String, String>,
}

/// Crop handling settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CroppingConfig {
    /// What to do with rectangles that leave the original image.
    pub bounds: BoundsPolicy,
}

/// Storage backend for renditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    #[default]
    Filesystem,
    Remote,
}

/// Storage location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub mode: StorageMode,
    /// Root directory for filesystem storage.
    pub root: String,
    /// Public base URL for remote storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::Filesystem,
            root: "public/system".to_string(),
            base_url: None,
        }
    }
}

impl StorageConfig {
    /// Local path of a rendition: `<root>/<attachment>/<style>/<file>`.
    pub fn local_path(&self, attachment: &str, style: &str, file_name: &str) -> PathBuf {
        Path::new(&self.root)
            .join(attachment)
            .join(style)
            .join(file_name)
    }

    /// Where a rendition can be read from under the configured mode.
    pub fn locate(&self, attachment: &str, style: &str, file_name: &str) -> SourceLocation {
        match self.mode {
            StorageMode::Filesystem => {
                SourceLocation::Path(self.local_path(attachment, style, file_name))
            }
            StorageMode::Remote => {
                let base = self.base_url.as_deref().unwrap_or("").trim_end_matches('/');
                SourceLocation::Url(format!("{base}/{attachment}/{style}/{file_name}"))
            }
        }
    }
}

impl CropConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.mode == StorageMode::Remote
            && self.storage.base_url.as_deref().is_none_or(str::is_empty)
        {
            return Err(ConfigError::Validation(
                "storage.base_url is required when storage.mode = \"remote\"".into(),
            ));
        }
        for (attachment, config) in &self.attachments {
            if attachment.is_empty() || attachment.contains("__") || attachment.ends_with('_') {
                return Err(ConfigError::Validation(format!(
                    "attachment name '{attachment}' must be non-empty, without '__' or a trailing '_'"
                )));
            }
            for (style, geometry) in &config.styles {
                if style.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "attachments.{attachment}.styles: style names must be non-empty"
                    )));
                }
                let parsed = StyleGeometry::parse(geometry).map_err(|_| {
                    ConfigError::Validation(format!(
                        "attachments.{attachment}.styles.{style}: '{geometry}' is not WxH"
                    ))
                })?;
                if parsed.width == 0 || parsed.height == 0 {
                    return Err(ConfigError::Validation(format!(
                        "attachments.{attachment}.styles.{style}: dimensions must be non-zero"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Build the attachment definition for `name`, if configured.
    pub fn attachment(&self, name: &str) -> Option<Attachment> {
        self.attachments.get(name).map(|config| Attachment {
            name: name.to_string(),
            styles: config
                .styles
                .iter()
                .map(|(style, geometry)| Style {
                    name: style.clone(),
                    geometry: geometry.clone(),
                })
                .collect(),
        })
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(CropConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<CropConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: CropConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, merged over stock defaults and validated.
///
/// A missing file yields the stock defaults (no attachments).
pub fn load_config(path: &Path) -> Result<CropConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `stylecrop.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# stylecrop configuration
# =======================
# All settings are optional. Values shown below are the defaults, except
# for the example attachment at the bottom.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# "filesystem" reads and writes <root>/<attachment>/<style>/<file>.
# "remote" reads <base_url>/<attachment>/<style>/<file>; writing renders
# back to remote storage is left to the host application.
mode = "filesystem"
root = "public/system"
# base_url = "https://cdn.example.com/system"

# ---------------------------------------------------------------------------
# Cropping
# ---------------------------------------------------------------------------
[cropping]
# What to do with a crop rectangle that leaves the original image:
#   passthrough - hand it to the pipeline unchanged
#   reject      - fail the reprocess before rendering
#   clamp       - intersect it with the original image
bounds = "passthrough"

# ---------------------------------------------------------------------------
# Attachments
# ---------------------------------------------------------------------------
# One table per attachment. Style geometry is "WxH" with an optional
# modifier: # fill+crop, > shrink only, < enlarge only, ! exact, ^ cover.
[attachments.avatar.styles]
thumb = "50x50#"
medium = "300x300>"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_filesystem_passthrough() {
        let config = CropConfig::default();
        assert_eq!(config.storage.mode, StorageMode::Filesystem);
        assert_eq!(config.storage.root, "public/system");
        assert_eq!(config.cropping.bounds, BoundsPolicy::Passthrough);
        assert!(config.attachments.is_empty());
    }

    #[test]
    fn parse_attachment_styles() {
        let toml = r##"
[attachments.avatar.styles]
thumb = "50x50#"
medium = "300x300>"
"##;
        let config: CropConfig = toml::from_str(toml).unwrap();
        let avatar = config.attachment("avatar").unwrap();
        let names: Vec<&str> = avatar.style_names().collect();
        assert_eq!(names, vec!["medium", "thumb"]);
        assert_eq!(avatar.style("thumb").unwrap().geometry, "50x50#");
    }

    #[test]
    fn every_attachment_table_is_available() {
        let toml = r##"
[attachments.avatar.styles]
thumb = "50x50#"

[attachments.banner.styles]
wide = "1200x300#"
"##;
        let config: CropConfig = toml::from_str(toml).unwrap();
        assert!(config.attachment("avatar").is_some());
        assert_eq!(config.attachment("banner").unwrap().styles[0].geometry, "1200x300#");
        assert!(config.attachment("cover").is_none());
    }

    #[test]
    fn parse_bounds_policy() {
        let config: CropConfig = toml::from_str("[cropping]\nbounds = \"clamp\"\n").unwrap();
        assert_eq!(config.cropping.bounds, BoundsPolicy::Clamp);
    }

    // =========================================================================
    // Storage locations
    // =========================================================================

    #[test]
    fn filesystem_locate_builds_path() {
        let storage = StorageConfig {
            root: "/srv/uploads".into(),
            ..StorageConfig::default()
        };
        assert_eq!(
            storage.locate("avatar", "thumb", "me.jpg"),
            SourceLocation::Path("/srv/uploads/avatar/thumb/me.jpg".into())
        );
    }

    #[test]
    fn remote_locate_builds_url() {
        let storage = StorageConfig {
            mode: StorageMode::Remote,
            base_url: Some("https://cdn.test/system/".into()),
            ..StorageConfig::default()
        };
        assert_eq!(
            storage.locate("avatar", "original", "me.jpg"),
            SourceLocation::Url("https://cdn.test/system/avatar/original/me.jpg".into())
        );
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert!(config.attachments.is_empty());
        assert_eq!(config.storage.root, "public/system");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r##"
[storage]
root = "/var/media"

[attachments.avatar.styles]
thumb = "50x50#"
"##,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.storage.root, "/var/media");
        // Unspecified values keep their defaults
        assert_eq!(config.storage.mode, StorageMode::Filesystem);
        assert_eq!(config.cropping.bounds, BoundsPolicy::Passthrough);
        assert!(config.attachment("avatar").is_some());
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "this is not valid toml [[[").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let result: Result<CropConfig, _> = toml::from_str("[cropping]\nbound = \"clamp\"\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("unknown field"));
    }

    #[test]
    fn unknown_policy_rejected() {
        let result: Result<CropConfig, _> = toml::from_str("[cropping]\nbounds = \"wrap\"\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_remote_requires_base_url() {
        let mut config = CropConfig::default();
        config.storage.mode = StorageMode::Remote;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("base_url"));

        config.storage.base_url = Some("https://cdn.test".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_malformed_geometry() {
        let mut config = CropConfig::default();
        config
            .attachments
            .entry("avatar".into())
            .or_default()
            .styles
            .insert("thumb".into(), "small".into());
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_zero_dimensions() {
        let mut config = CropConfig::default();
        config
            .attachments
            .entry("avatar".into())
            .or_default()
            .styles
            .insert("thumb".into(), "50x0".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("non-zero"));
    }

    #[test]
    fn validate_rejects_separator_in_attachment_name() {
        let mut config = CropConfig::default();
        config.attachments.insert("user__avatar".into(), AttachmentConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_trailing_underscore_in_attachment_name() {
        // "avatar_" would yield "avatar___thumb_crop_x", which splits as ("avatar", "_thumb").
        let toml = r##"
[attachments.avatar_.styles]
thumb = "50x50#"
"##;
        let config: CropConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("trailing '_'"));
    }

    #[test]
    fn validate_rejects_empty_style_name() {
        let toml = r##"
[attachments.avatar.styles]
"" = "50x50#"
"##;
        let config: CropConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "[attachments.avatar.styles]\nthumb = \"0x50\"\n").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[storage]
mode = "filesystem"
root = "public/system"
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str("[storage]\nroot = \"/srv\"\n").unwrap();
        let merged = merge_toml(base, overlay);
        let storage = merged.get("storage").unwrap();
        assert_eq!(storage.get("root").unwrap().as_str(), Some("/srv"));
        assert_eq!(storage.get("mode").unwrap().as_str(), Some("filesystem"));
    }

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("bounds = \"passthrough\"").unwrap();
        let overlay: toml::Value = toml::from_str("bounds = \"reject\"").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("bounds").unwrap().as_str(), Some("reject"));
    }

    // =========================================================================
    // stock config tests
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid() {
        let config = resolve_config(stock_defaults_value(), Some(toml::from_str(stock_config_toml()).unwrap()))
            .unwrap();
        assert_eq!(config.storage.root, "public/system");
        assert_eq!(config.cropping.bounds, BoundsPolicy::Passthrough);
        assert!(config.attachment("avatar").is_some());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        assert!(val.is_table());
        assert!(val.get("storage").is_some());
        assert!(val.get("cropping").is_some());
        assert!(val.get("attachments").is_some());
    }
}
