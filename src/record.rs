//! The record side of cropping.
//!
//! A host model opts into cropping by implementing [`CroppableRecord`]: it
//! exposes its [`CropAttributes`], its attachment definitions, the stored
//! file name per attachment, and a `touch` hook for its updated-at stamp.
//! Everything else (dirty tracking, form dispatch, state queries) comes from
//! provided methods.
//!
//! [`MemoryRecord`] is the in-crate implementation used by the CLI and tests.

use crate::attributes::{AttrValue, CropAttributes, CropKey, CropSuffix};
use crate::state;
use crate::types::Attachment;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened to a batch of submitted form fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormOutcome {
    /// Fields that addressed a configured attachment and style.
    pub applied: Vec<String>,
    /// Field names that did not; left for the host to handle.
    pub unrecognized: Vec<String>,
    /// Whether any stored value changed.
    pub dirtied: bool,
}

/// Capability interface for records carrying crop attributes.
pub trait CroppableRecord {
    fn crop_attributes(&self) -> &CropAttributes;

    fn crop_attributes_mut(&mut self) -> &mut CropAttributes;

    /// Definition of a configured attachment.
    fn attachment(&self, name: &str) -> Option<&Attachment>;

    /// Stored file name of an attachment, `None` when nothing is uploaded.
    fn attached_file(&self, name: &str) -> Option<&str>;

    /// Mark the record as modified.
    fn touch(&mut self);

    fn get_crop_attribute(&self, attachment: &str, style: &str, suffix: CropSuffix) -> Option<&AttrValue> {
        self.crop_attributes().get(attachment, style, suffix)
    }

    /// Store a crop attribute, touching the record when the value changed.
    fn assign_crop_attribute(
        &mut self,
        attachment: &str,
        style: &str,
        suffix: CropSuffix,
        value: Option<AttrValue>,
    ) -> bool {
        let dirtied = self
            .crop_attributes_mut()
            .set(attachment, style, suffix, value);
        if dirtied {
            self.touch();
        }
        dirtied
    }

    fn is_cropping(&self, attachment: &str, style: &str) -> bool {
        state::is_cropping(self.crop_attributes(), attachment, style)
    }

    /// False for attachments that are not configured.
    fn has_pending_crop(&self, attachment: &str) -> bool {
        self.attachment(attachment)
            .is_some_and(|a| state::has_pending_crop(self.crop_attributes(), a))
    }

    /// Clear the rectangle of every style of `attachment`.
    fn reset_crop_attributes_of(&mut self, attachment: &str) -> bool {
        let Some(definition) = self.attachment(attachment).cloned() else {
            return false;
        };
        let changed = state::reset(self.crop_attributes_mut(), &definition);
        if changed {
            self.touch();
        }
        changed
    }

    /// Dispatch submitted form fields into the store.
    ///
    /// A field is applied when its name parses as a crop field and names a
    /// configured attachment and style. Blank values clear the field.
    fn apply_form_fields<I, K, V>(&mut self, fields: I) -> FormOutcome
    where
        Self: Sized,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut outcome = FormOutcome::default();
        for (name, raw) in fields {
            let name = name.as_ref();
            let Some(key) = CropKey::parse(name).filter(|key| self.recognizes(key)) else {
                outcome.unrecognized.push(name.to_string());
                continue;
            };
            let value = Some(AttrValue::from_form(raw.as_ref())).filter(|v| !v.is_blank());
            outcome.dirtied |= self.assign_crop_attribute(&key.attachment, &key.style, key.suffix, value);
            outcome.applied.push(key.field_name());
        }
        if !outcome.unrecognized.is_empty() {
            tracing::debug!(fields = ?outcome.unrecognized, "ignored unrecognized form fields");
        }
        outcome
    }

    /// Whether `key` addresses a configured attachment and style.
    fn recognizes(&self, key: &CropKey) -> bool {
        self.attachment(&key.attachment)
            .is_some_and(|a| a.style(&key.style).is_some())
    }
}

/// A plain in-memory record: attachments, their stored files, crop state.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecord {
    attachments: Vec<Attachment>,
    files: Vec<(String, String)>,
    crop: CropAttributes,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MemoryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `file_name` under `attachment`.
    pub fn with_attachment(mut self, attachment: Attachment, file_name: impl Into<String>) -> Self {
        self.files.push((attachment.name.clone(), file_name.into()));
        self.attachments.push(attachment);
        self
    }
}

impl CroppableRecord for MemoryRecord {
    fn crop_attributes(&self) -> &CropAttributes {
        &self.crop
    }

    fn crop_attributes_mut(&mut self) -> &mut CropAttributes {
        &mut self.crop
    }

    fn attachment(&self, name: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.name == name)
    }

    fn attached_file(&self, name: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|(attachment, _)| attachment == name)
            .map(|(_, file)| file.as_str())
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}
