//! The image pipeline boundary: command planning and execution.
//!
//! The crop core never touches pixels. It hands this module a list of
//! ImageMagick-style command tokens per style and gets a rendered file back.
//!
//! | Piece | Role |
//! |---|---|
//! | **Calculations** | Pure dimension math (fit, fill, center offsets) |
//! | **Parameters** | [`ConvertParams`] and the [`Directive`] token vocabulary |
//! | **Operations** | [`plan_transformation`]: the base command for a style |
//! | **Backend** | [`ImageBackend`] trait + [`RustBackend`] + [`MagickBackend`] |
//! | **Pipeline** | [`StylePipeline`] trait + [`ImagePipeline`] (render, then persist) |

pub mod backend;
mod calculations;
pub mod magick_backend;
pub mod operations;
mod params;
pub mod pipeline;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use magick_backend::MagickBackend;
pub use operations::plan_transformation;
pub use params::{ConvertParams, Directive, parse_directives};
pub use pipeline::{ImagePipeline, PipelineError, RenderedStyle, StylePipeline};
pub use rust_backend::RustBackend;
