//! # stylecrop
//!
//! Per-style crop metadata for image attachments. Each named rendition
//! ("style") of an upload can carry a user-chosen rectangle; when a record
//! is saved with a complete rectangle, the affected attachment is
//! re-rendered with that crop spliced into each style's pipeline command.
//!
//! # Flow
//!
//! ```text
//! form fields ──▶ CroppableRecord ──▶ CropAttributes        (attributes, record)
//!                                         │
//!   after_update hook ──▶ has_pending_crop?                 (state)
//!                                         │ yes
//!             per style: base command + crop fragment       (command)
//!                                         │
//!             StylePipeline: render → persist               (imaging)
//!                                         │
//!                               reset rectangles            (reprocess)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Attachments, styles, storage locations |
//! | [`geometry`] | Declared style geometry, aspect ratios, stored-image geometry |
//! | [`attributes`] | The `(attachment, style, suffix)` store and field naming |
//! | [`state`] | Cropping / pending / reset queries |
//! | [`command`] | Crop directive synthesis and bounds policy |
//! | [`record`] | The [`CroppableRecord`](record::CroppableRecord) capability trait |
//! | [`reprocess`] | The post-update state machine |
//! | [`widgets`] | Preview and crop editor widget data |
//! | [`imaging`] | Pipeline boundary: planner, backends, staging + persistence |
//! | [`config`] | `stylecrop.toml` loading, merging, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Explicit Keyed Store
//!
//! Crop fields are addressed by `(attachment, style, suffix)` in one map
//! rather than a field per combination. The flat form name
//! `<attachment>__<style>_<suffix>` is parsed at the edge and validated
//! against configuration; anything else falls through to the host.
//!
//! ## Crops Are Ephemeral
//!
//! Rectangles live in the in-memory record only and are cleared after a
//! successful reprocess. Nothing about a crop is persisted; a new crop must
//! be submitted on every crop-and-save cycle.
//!
//! ## User Crop Runs First
//!
//! Rectangles are picked on the original image, so the user's `-crop`
//! replaces any crop the style's own command carries and goes in front of
//! the resize.

pub mod attributes;
pub mod command;
pub mod config;
pub mod geometry;
pub mod imaging;
pub mod output;
pub mod record;
pub mod reprocess;
pub mod state;
pub mod types;
pub mod widgets;

#[cfg(test)]
pub(crate) mod test_helpers;
