//! Per-attachment, per-style crop attribute storage.
//!
//! Every crop field is addressed by three parts: attachment name, style
//! name, and a [`CropSuffix`]. The UI and the back end agree on a flat field
//! name for each combination:
//!
//! ```text
//! <attachment>__<style>_<suffix>
//! avatar__thumb_crop_x
//! avatar__medium_original_w
//! ```
//!
//! The set of valid names is open-ended: it follows whatever attachments and
//! styles are configured at runtime. [`CropKey::parse`] splits a name back
//! into its parts; whether the attachment and style actually exist is for the
//! owning record to decide (see [`record`](crate::record)).
//!
//! ## Ephemeral state
//!
//! A [`CropAttributes`] store lives inside one in-memory record and is never
//! persisted. Crop rectangles must be resubmitted on every crop-and-save
//! cycle; a host that wants them durable has to store them itself.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static FIELD_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let suffixes: Vec<&str> = CropSuffix::ALL.iter().map(|s| s.as_str()).collect();
    Regex::new(&format!(r"^(.+?)__(.+)_({})$", suffixes.join("|")))
        .expect("field name pattern must compile")
});

/// The nine crop fields kept per `(attachment, style)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CropSuffix {
    CropX,
    CropY,
    CropW,
    CropH,
    OriginalW,
    OriginalH,
    BoxW,
    CroppedGeometries,
    Aspect,
}

impl CropSuffix {
    pub const ALL: [CropSuffix; 9] = [
        CropSuffix::CropX,
        CropSuffix::CropY,
        CropSuffix::CropW,
        CropSuffix::CropH,
        CropSuffix::OriginalW,
        CropSuffix::OriginalH,
        CropSuffix::BoxW,
        CropSuffix::CroppedGeometries,
        CropSuffix::Aspect,
    ];

    /// The fields that make up the crop rectangle itself.
    pub const RECTANGLE: [CropSuffix; 4] = [
        CropSuffix::CropX,
        CropSuffix::CropY,
        CropSuffix::CropW,
        CropSuffix::CropH,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CropSuffix::CropX => "crop_x",
            CropSuffix::CropY => "crop_y",
            CropSuffix::CropW => "crop_w",
            CropSuffix::CropH => "crop_h",
            CropSuffix::OriginalW => "original_w",
            CropSuffix::OriginalH => "original_h",
            CropSuffix::BoxW => "box_w",
            CropSuffix::CroppedGeometries => "cropped_geometries",
            CropSuffix::Aspect => "aspect",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CropSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CropSuffix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CropSuffix::ALL
            .into_iter()
            .find(|suffix| suffix.as_str() == s)
            .ok_or_else(|| format!("unknown crop suffix '{s}'"))
    }
}

/// Canonical field name for one crop attribute.
pub fn field_name(attachment: &str, style: &str, suffix: CropSuffix) -> String {
    format!("{attachment}__{style}_{suffix}")
}

/// The three parts identifying one crop attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CropKey {
    pub attachment: String,
    pub style: String,
    pub suffix: CropSuffix,
}

impl CropKey {
    pub fn new(attachment: impl Into<String>, style: impl Into<String>, suffix: CropSuffix) -> Self {
        Self {
            attachment: attachment.into(),
            style: style.into(),
            suffix,
        }
    }

    /// Split `<attachment>__<style>_<suffix>` into its parts.
    ///
    /// The attachment ends at the first `__`; the suffix is the known suffix
    /// at the end, so style names may contain underscores.
    pub fn parse(name: &str) -> Option<Self> {
        let caps = FIELD_NAME_PATTERN.captures(name)?;
        let suffix = caps[3].parse().ok()?;
        Some(Self::new(&caps[1], &caps[2], suffix))
    }

    pub fn field_name(&self) -> String {
        field_name(&self.attachment, &self.style, self.suffix)
    }
}

/// A stored crop attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    /// Parse a submitted form value: integer first, then float, else text.
    pub fn from_form(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return AttrValue::Integer(i);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => AttrValue::Float(f),
            _ => AttrValue::Text(raw.to_string()),
        }
    }

    /// Whitespace-only text counts as not provided.
    pub fn is_blank(&self) -> bool {
        matches!(self, AttrValue::Text(t) if t.trim().is_empty())
    }

    /// Integer view: floats round to nearest, numeric text is parsed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Integer(i) => Some(*i),
            AttrValue::Float(f) if f.is_finite() => Some(f.round() as i64),
            AttrValue::Float(_) => None,
            AttrValue::Text(t) => match AttrValue::from_form(t) {
                AttrValue::Text(_) => None,
                numeric => numeric.as_i64(),
            },
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Integer(i) => Some(*i as f64),
            AttrValue::Float(f) => Some(*f),
            AttrValue::Text(t) => t.trim().parse().ok(),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Integer(i) => write!(f, "{i}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Text(t) => f.write_str(t),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Integer(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Integer(value.into())
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        AttrValue::Integer(value.into())
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

/// All crop fields for one `(attachment, style)` pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CropRecord {
    values: [Option<AttrValue>; 9],
}

impl CropRecord {
    pub fn get(&self, suffix: CropSuffix) -> Option<&AttrValue> {
        self.values[suffix.index()].as_ref()
    }

    fn slot(&mut self, suffix: CropSuffix) -> &mut Option<AttrValue> {
        &mut self.values[suffix.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Present fields with their suffixes, in suffix order.
    pub fn fields(&self) -> impl Iterator<Item = (CropSuffix, &AttrValue)> {
        CropSuffix::ALL
            .into_iter()
            .filter_map(|suffix| self.get(suffix).map(|v| (suffix, v)))
    }
}

/// Map from `(attachment, style, suffix)` to a value.
///
/// Absence is the "not set" state; there is no separate null value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CropAttributes {
    records: BTreeMap<String, BTreeMap<String, CropRecord>>,
}

impl CropAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, attachment: &str, style: &str, suffix: CropSuffix) -> Option<&AttrValue> {
        self.record(attachment, style)?.get(suffix)
    }

    /// Store `value` (or clear with `None`).
    ///
    /// Returns `true` when the stored value changed. The store never touches
    /// timestamps itself; callers decide what a change means for their host.
    pub fn set(
        &mut self,
        attachment: &str,
        style: &str,
        suffix: CropSuffix,
        value: Option<AttrValue>,
    ) -> bool {
        if self.get(attachment, style, suffix) == value.as_ref() {
            return false;
        }
        let record = self
            .records
            .entry(attachment.to_string())
            .or_default()
            .entry(style.to_string())
            .or_default();
        *record.slot(suffix) = value;
        true
    }

    /// Keyed variant of [`get`](Self::get).
    pub fn get_key(&self, key: &CropKey) -> Option<&AttrValue> {
        self.get(&key.attachment, &key.style, key.suffix)
    }

    /// Keyed variant of [`set`](Self::set).
    pub fn set_key(&mut self, key: &CropKey, value: Option<AttrValue>) -> bool {
        self.set(&key.attachment, &key.style, key.suffix, value)
    }

    pub fn record(&self, attachment: &str, style: &str) -> Option<&CropRecord> {
        self.records.get(attachment)?.get(style)
    }

    /// True when no field of any pair is set.
    pub fn is_empty(&self) -> bool {
        self.records
            .values()
            .flat_map(BTreeMap::values)
            .all(CropRecord::is_empty)
    }

    /// Every set field as `(field name, value)`, sorted by attachment and style.
    pub fn fields(&self) -> Vec<(String, &AttrValue)> {
        self.records
            .iter()
            .flat_map(|(attachment, styles)| {
                styles.iter().flat_map(move |(style, record)| {
                    record
                        .fields()
                        .map(move |(suffix, value)| (field_name(attachment, style, suffix), value))
                })
            })
            .collect()
    }
}
