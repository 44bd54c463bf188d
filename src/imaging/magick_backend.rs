//! ImageMagick backend: shells out to `convert` and `identify`.
//!
//! Tokens are passed through untouched, so anything ImageMagick understands
//! works here, including directives the [`RustBackend`](super::RustBackend)
//! rejects. ImageMagick also reads `http(s)` sources directly, which makes
//! this the backend for remote storage.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::ConvertParams;
use crate::geometry::parse_dimensions;
use crate::types::SourceLocation;
use std::process::{Command, Output};

/// Backend driving the ImageMagick command-line tools.
#[derive(Debug, Clone)]
pub struct MagickBackend {
    convert_program: String,
    identify_program: String,
}

impl MagickBackend {
    pub fn new() -> Self {
        Self::with_programs("convert", "identify")
    }

    /// Use explicit program names, e.g. `magick` wrappers on newer installs.
    pub fn with_programs(convert: impl Into<String>, identify: impl Into<String>) -> Self {
        Self {
            convert_program: convert.into(),
            identify_program: identify.into(),
        }
    }

    /// Arguments for `convert`: source, tokens, output.
    pub fn convert_args(params: &ConvertParams) -> Vec<String> {
        let mut args = Vec::with_capacity(params.tokens.len() + 2);
        args.push(params.source.to_string());
        args.extend(params.tokens.iter().cloned());
        args.push(params.output.to_string_lossy().to_string());
        args
    }
}

impl Default for MagickBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn check_status(program: &str, output: Output) -> Result<Output, BackendError> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(BackendError::ProcessingFailed(format!(
            "{program} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

impl ImageBackend for MagickBackend {
    fn identify(&self, source: &SourceLocation) -> Result<Dimensions, BackendError> {
        // First frame only, so animated sources report a single size.
        let target = format!("{source}[0]");
        let output = Command::new(&self.identify_program)
            .args(["-format", "%wx%h", target.as_str()])
            .output()?;
        let output = check_status(&self.identify_program, output)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (width, height) = parse_dimensions(&stdout).ok_or_else(|| {
            BackendError::ProcessingFailed(format!("unexpected identify output '{}'", stdout.trim()))
        })?;
        Ok(Dimensions { width, height })
    }

    fn convert(&self, params: &ConvertParams) -> Result<(), BackendError> {
        if let Some(parent) = params.output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let args = Self::convert_args(params);
        tracing::debug!(program = %self.convert_program, ?args, "running convert");

        let output = Command::new(&self.convert_program).args(&args).output()?;
        check_status(&self.convert_program, output)?;
        Ok(())
    }
}
