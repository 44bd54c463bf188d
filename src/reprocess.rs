//! Reprocessing after a record update.
//!
//! The host calls [`ReprocessCoordinator::after_update`] from its post-save
//! hook. When an attachment has a pending crop, every configured style is
//! re-rendered (cropped ones with their rectangle, the rest with their
//! plain command), the renders are persisted together, and the rectangles
//! are cleared.
//!
//! ```text
//!            pending crop              all rendered + persisted
//!   Idle ───────────────▶ CropPending ──▶ Reprocessing ─────────────▶ Idle
//!                                              │
//!                                              └── any error ──▶ Failed
//! ```
//!
//! A failed pass keeps the crop fields, so the next hook invocation retries
//! with the same rectangle.

use crate::command::{self, BoundsPolicy, CommandError};
use crate::imaging::{PipelineError, RenderedStyle, StylePipeline};
use crate::record::CroppableRecord;
use crate::state;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReprocessError {
    #[error("attachment '{0}' is not configured")]
    UnknownAttachment(String),
    #[error("attachment '{0}' has no stored file")]
    NoFile(String),
    #[error("invalid crop for style '{style}': {source}")]
    Command {
        style: String,
        #[source]
        source: CommandError,
    },
    #[error("pipeline failed: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Where the coordinator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReprocessState {
    #[default]
    Idle,
    CropPending,
    Reprocessing,
    Failed,
}

/// Result of one hook invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "renders", rename_all = "snake_case")]
pub enum ReprocessOutcome {
    /// No style had a complete rectangle.
    Skipped,
    /// Every style was re-rendered and persisted.
    Reprocessed(Vec<RenderedStyle>),
}

/// Drives a [`StylePipeline`] from a record's crop state.
pub struct ReprocessCoordinator<'p, P: StylePipeline> {
    pipeline: &'p P,
    policy: BoundsPolicy,
    state: ReprocessState,
}

impl<'p, P: StylePipeline> ReprocessCoordinator<'p, P> {
    pub fn new(pipeline: &'p P, policy: BoundsPolicy) -> Self {
        Self {
            pipeline,
            policy,
            state: ReprocessState::Idle,
        }
    }

    pub fn state(&self) -> ReprocessState {
        self.state
    }

    /// Post-update hook for one attachment of `record`.
    pub fn after_update<R: CroppableRecord>(
        &mut self,
        record: &mut R,
        attachment: &str,
    ) -> Result<ReprocessOutcome, ReprocessError> {
        let definition = record
            .attachment(attachment)
            .cloned()
            .ok_or_else(|| ReprocessError::UnknownAttachment(attachment.to_string()))?;

        let pending = state::pending_styles(record.crop_attributes(), &definition);
        if pending.is_empty() {
            tracing::debug!(attachment, "no pending crop, skipping reprocess");
            return Ok(ReprocessOutcome::Skipped);
        }
        self.state = ReprocessState::CropPending;
        tracing::debug!(attachment, ?pending, "crop pending");

        let file_name = record
            .attached_file(attachment)
            .map(str::to_string)
            .ok_or_else(|| self.fail(ReprocessError::NoFile(attachment.to_string())))?;

        self.state = ReprocessState::Reprocessing;
        tracing::info!(attachment, file = %file_name, "reprocessing cropped attachment");

        let mut renders = Vec::with_capacity(definition.styles.len());
        for style in definition.style_names() {
            let fragment =
                command::crop_fragment(record.crop_attributes(), attachment, style, self.policy)
                    .map_err(|source| {
                        self.fail(ReprocessError::Command {
                            style: style.to_string(),
                            source,
                        })
                    })?;
            let base = self
                .pipeline
                .base_command(&definition, style, &file_name)
                .map_err(|e| self.fail(e.into()))?;
            let tokens = command::compose(base, fragment.as_ref());
            tracing::debug!(attachment, style, ?tokens, "composed style command");

            let render = self
                .pipeline
                .render(&definition, style, &file_name, tokens)
                .map_err(|e| self.fail(e.into()))?;
            renders.push(render);
        }

        self.pipeline
            .persist(&renders)
            .map_err(|e| self.fail(e.into()))?;

        record.reset_crop_attributes_of(attachment);
        self.state = ReprocessState::Idle;
        tracing::info!(attachment, styles = renders.len(), "reprocess complete");
        Ok(ReprocessOutcome::Reprocessed(renders))
    }

    fn fail(&mut self, err: ReprocessError) -> ReprocessError {
        tracing::warn!(error = %err, "reprocess failed, crop fields kept");
        self.state = ReprocessState::Failed;
        err
    }
}
