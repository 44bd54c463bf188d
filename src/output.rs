//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Styles
//!
//! ```text
//! avatar
//! 001 thumb 50x50# (aspect 1.000)
//! 002 medium 300x300> (aspect 1.000)
//! ```
//!
//! ## Crop
//!
//! ```text
//! Form
//!     Applied: 4 fields
//!     Ignored: title
//! avatar: reprocessed 2 styles
//! 001 medium
//!     Command: -resize 300x300>
//!     Stored: public/system/avatar/medium/me.png
//! 002 thumb
//!     Command: -crop 200x200+0+0 -resize 50x50^ +repage
//!     Stored: public/system/avatar/thumb/me.png
//! ```

use crate::config::StorageConfig;
use crate::geometry::{aspect_for_style, styles};
use crate::record::FormOutcome;
use crate::reprocess::ReprocessOutcome;
use crate::types::Attachment;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Join command tokens for display.
pub fn format_command(tokens: &[String]) -> String {
    tokens.join(" ")
}

// ============================================================================
// styles
// ============================================================================

/// Format the styles of one attachment with geometry and aspect.
pub fn format_styles(attachment: &Attachment) -> Vec<String> {
    let mut lines = vec![attachment.name.clone()];
    let styles = styles(attachment);
    if styles.is_empty() {
        lines.push(format!("{}(no styles)", indent(1)));
        return lines;
    }
    for (i, (name, geometry)) in styles.into_iter().enumerate() {
        let aspect = match aspect_for_style(attachment, name) {
            Ok(a) => format!("aspect {a:.3}"),
            Err(_) => "aspect undefined".to_string(),
        };
        lines.push(format!(
            "{} {} {} ({})",
            format_index(i + 1),
            name,
            geometry,
            aspect
        ));
    }
    lines
}

/// Print styles to stdout.
pub fn print_styles(attachment: &Attachment) {
    for line in format_styles(attachment) {
        println!("{}", line);
    }
}

// ============================================================================
// crop
// ============================================================================

/// Format the form dispatch summary and the reprocess result.
pub fn format_crop_output(
    attachment: &str,
    form: &FormOutcome,
    outcome: &ReprocessOutcome,
    storage: &StorageConfig,
) -> Vec<String> {
    let mut lines = vec!["Form".to_string()];
    lines.push(format!("{}Applied: {} fields", indent(1), form.applied.len()));
    if !form.unrecognized.is_empty() {
        lines.push(format!("{}Ignored: {}", indent(1), form.unrecognized.join(", ")));
    }

    match outcome {
        ReprocessOutcome::Skipped => {
            lines.push(format!("{attachment}: no pending crop, nothing reprocessed"));
        }
        ReprocessOutcome::Reprocessed(renders) => {
            lines.push(format!("{attachment}: reprocessed {} styles", renders.len()));
            for (i, render) in renders.iter().enumerate() {
                lines.push(format!("{} {}", format_index(i + 1), render.style));
                lines.push(format!(
                    "{}Command: {}",
                    indent(1),
                    format_command(&render.tokens)
                ));
                let stored = storage.local_path(&render.attachment, &render.style, &render.file_name);
                lines.push(format!("{}Stored: {}", indent(1), stored.display()));
            }
        }
    }
    lines
}

/// Print crop output to stdout.
pub fn print_crop_output(
    attachment: &str,
    form: &FormOutcome,
    outcome: &ReprocessOutcome,
    storage: &StorageConfig,
) {
    for line in format_crop_output(attachment, form, outcome, storage) {
        println!("{}", line);
    }
}
