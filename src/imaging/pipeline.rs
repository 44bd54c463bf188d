//! The style pipeline: base command, render, persist.
//!
//! [`StylePipeline`] is the seam the reprocess coordinator drives. It knows
//! nothing about crops; the coordinator asks for a style's base command,
//! splices the user crop in, and hands the final tokens back for rendering.
//!
//! [`ImagePipeline`] is the concrete adapter over an [`ImageBackend`]:
//!
//! ```text
//! <root>/avatar/original/me.png
//!     │  convert <tokens>
//!     ▼
//! <staging>/avatar/thumb/me.png      (tempfile::TempDir)
//!     │  persist
//!     ▼
//! <root>/avatar/thumb/me.png
//! ```
//!
//! Rendering all styles into staging before persisting any of them means a
//! failed style leaves every stored rendition untouched.

use super::backend::{BackendError, ImageBackend};
use super::operations::plan_transformation;
use super::params::ConvertParams;
use crate::config::{StorageConfig, StorageMode};
use crate::geometry::{GeometryError, GeometryResolver, style_geometry};
use crate::types::{Attachment, ORIGINAL_STYLE};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image processing failed: {0}")]
    Backend(#[from] BackendError),
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
    #[error("cannot persist {0}: writing to remote storage is not supported")]
    RemoteStorage(String),
}

/// One style rendered into staging, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedStyle {
    pub attachment: String,
    pub style: String,
    pub file_name: String,
    /// Final command the style was rendered with.
    pub tokens: Vec<String>,
    /// Staged output file.
    pub staged: PathBuf,
}

/// The black box that turns command tokens into stored renditions.
pub trait StylePipeline {
    /// Command a style renders with when nobody crops it.
    fn base_command(
        &self,
        attachment: &Attachment,
        style: &str,
        file_name: &str,
    ) -> Result<Vec<String>, PipelineError>;

    /// Render the original upload with `tokens` for one style.
    fn render(
        &self,
        attachment: &Attachment,
        style: &str,
        file_name: &str,
        tokens: Vec<String>,
    ) -> Result<RenderedStyle, PipelineError>;

    /// Make rendered styles the stored renditions.
    fn persist(&self, renders: &[RenderedStyle]) -> Result<(), PipelineError>;
}

/// [`StylePipeline`] over an [`ImageBackend`] and the configured storage.
pub struct ImagePipeline<'a, B: ImageBackend> {
    backend: &'a B,
    storage: &'a StorageConfig,
    resolver: GeometryResolver<'a, B>,
    staging: TempDir,
}

impl<'a, B: ImageBackend> ImagePipeline<'a, B> {
    pub fn new(backend: &'a B, storage: &'a StorageConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            backend,
            storage,
            resolver: GeometryResolver::new(backend, storage),
            staging: TempDir::new()?,
        })
    }

    /// Geometry lookups made while planning, shared with callers that need
    /// the original's size (e.g. to fill in `original_w`).
    pub fn resolver(&self) -> &GeometryResolver<'a, B> {
        &self.resolver
    }

    fn staged_path(&self, attachment: &str, style: &str, file_name: &str) -> PathBuf {
        self.staging
            .path()
            .join(attachment)
            .join(style)
            .join(file_name)
    }
}

impl<B: ImageBackend> StylePipeline for ImagePipeline<'_, B> {
    fn base_command(
        &self,
        attachment: &Attachment,
        style: &str,
        file_name: &str,
    ) -> Result<Vec<String>, PipelineError> {
        let geometry = style_geometry(attachment, style)?;
        let original = self.resolver.original_geometry(attachment, file_name)?;
        Ok(plan_transformation(original, &geometry))
    }

    fn render(
        &self,
        attachment: &Attachment,
        style: &str,
        file_name: &str,
        tokens: Vec<String>,
    ) -> Result<RenderedStyle, PipelineError> {
        let params = ConvertParams {
            source: self.storage.locate(&attachment.name, ORIGINAL_STYLE, file_name),
            output: self.staged_path(&attachment.name, style, file_name),
            tokens,
        };
        tracing::debug!(
            attachment = %attachment.name,
            style,
            tokens = ?params.tokens,
            "rendering style"
        );
        self.backend.convert(&params)?;

        Ok(RenderedStyle {
            attachment: attachment.name.clone(),
            style: style.to_string(),
            file_name: file_name.to_string(),
            tokens: params.tokens,
            staged: params.output,
        })
    }

    fn persist(&self, renders: &[RenderedStyle]) -> Result<(), PipelineError> {
        if self.storage.mode == StorageMode::Remote {
            if let Some(first) = renders.first() {
                return Err(PipelineError::RemoteStorage(format!(
                    "{}/{}/{}",
                    first.attachment, first.style, first.file_name
                )));
            }
            return Ok(());
        }

        for render in renders {
            let dest = self
                .storage
                .local_path(&render.attachment, &render.style, &render.file_name);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&render.staged, &dest)?;
            tracing::info!(
                attachment = %render.attachment,
                style = %render.style,
                path = %dest.display(),
                "persisted rendition"
            );
        }
        Ok(())
    }
}
