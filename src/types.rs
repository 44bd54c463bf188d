//! Shared types describing attachments, their styles, and where stored
//! renditions live.
//!
//! Attachments are built from [`config`](crate::config) once per run and
//! passed to every component by reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Name of the pseudo-style holding the untouched upload.
pub const ORIGINAL_STYLE: &str = "original";

/// A named rendition of an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    pub name: String,
    /// Declared target geometry, e.g. `"200x200#"`.
    pub geometry: String,
}

/// An attachment definition: its name plus configured styles, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub styles: Vec<Style>,
}

impl Attachment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            styles: Vec::new(),
        }
    }

    /// Builder-style helper, mostly for tests and programmatic setups.
    pub fn with_style(mut self, name: impl Into<String>, geometry: impl Into<String>) -> Self {
        self.styles.push(Style {
            name: name.into(),
            geometry: geometry.into(),
        });
        self
    }

    pub fn style(&self, name: &str) -> Option<&Style> {
        self.styles.iter().find(|s| s.name == name)
    }

    pub fn style_names(&self) -> impl Iterator<Item = &str> {
        self.styles.iter().map(|s| s.name.as_str())
    }
}

/// Where a stored rendition can be read from.
///
/// Filesystem storage yields a path, remote object storage yields a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Path(PathBuf),
    Url(String),
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Path(p) => write!(f, "{}", p.display()),
            SourceLocation::Url(u) => f.write_str(u),
        }
    }
}
