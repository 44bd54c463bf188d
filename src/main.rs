use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use stylecrop::attributes::{AttrValue, CropAttributes, CropSuffix};
use stylecrop::command::{self, CropRect};
use stylecrop::config::{self, CropConfig};
use stylecrop::geometry::GeometryResolver;
use stylecrop::imaging::{ImageBackend, ImagePipeline, MagickBackend, RustBackend, StylePipeline};
use stylecrop::output;
use stylecrop::record::{CroppableRecord, MemoryRecord};
use stylecrop::reprocess::ReprocessCoordinator;
use stylecrop::types::Attachment;
use stylecrop::widgets;

#[derive(Parser)]
#[command(name = "stylecrop")]
#[command(about = "Per-style crop metadata and reprocessing for image attachments")]
#[command(long_about = "\
Per-style crop metadata and reprocessing for image attachments

Every style of an attachment can be cropped independently. Crop fields are
named <attachment>__<style>_<suffix>, for example:

  avatar__thumb_crop_x   avatar__thumb_crop_y
  avatar__thumb_crop_w   avatar__thumb_crop_h

Renditions are read from and written to:

  <storage.root>/<attachment>/<style>/<file>
  <storage.root>/<attachment>/original/<file>    # the upload

Run 'stylecrop gen-config' to generate a documented stylecrop.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendKind {
    /// Pure Rust (`image` crate), local files only
    Rust,
    /// ImageMagick `convert` / `identify`
    Magick,
}

/// Shared flags for commands that read images.
#[derive(clap::Args, Clone, Copy)]
struct BackendArgs {
    /// Image backend
    #[arg(long, value_enum, default_value_t = BackendKind::Rust)]
    backend: BackendKind,
}

#[derive(Subcommand)]
enum Command {
    /// List the styles of an attachment
    Styles { attachment: String },
    /// Print the crop preview widget for one style as JSON
    Preview {
        attachment: String,
        style: String,
        /// Stored file name
        #[arg(long)]
        file: String,
    },
    /// Print the crop editor widget for one style as JSON
    Cropbox {
        attachment: String,
        style: String,
        #[arg(long)]
        file: String,
        /// On-screen width of the editor (defaults to the original width)
        #[arg(long)]
        width: Option<u32>,
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Print the pipeline command for one style
    Command {
        attachment: String,
        style: String,
        #[arg(long)]
        file: String,
        /// Crop rectangle as x,y,w,h in original pixels
        #[arg(long, value_parser = parse_crop_arg)]
        crop: Option<CropRect>,
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Apply submitted form fields and reprocess the attachment
    Crop {
        attachment: String,
        #[arg(long)]
        file: String,
        /// JSON object of form field names to values
        #[arg(long)]
        form: PathBuf,
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Print a stock stylecrop.toml with all options documented
    GenConfig,
}

fn parse_crop_arg(raw: &str) -> Result<CropRect, String> {
    let parts: Vec<i64> = raw
        .split(',')
        .map(|p| p.trim().parse::<i64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("'{raw}': {e}"))?;
    match parts[..] {
        [x, y, w, h] => Ok(CropRect { x, y, w, h }),
        _ => Err(format!("'{raw}': expected x,y,w,h")),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("stylecrop=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let load_config = || config::load_config(&cli.config);

    match cli.command {
        Command::Styles { attachment } => {
            let config = load_config()?;
            output::print_styles(&find_attachment(&config, &attachment)?);
        }
        Command::Preview {
            attachment,
            style,
            file,
        } => {
            let config = load_config()?;
            let attachment = find_attachment(&config, &attachment)?;
            let backend = RustBackend::new();
            let resolver = GeometryResolver::new(&backend, &config.storage);
            let widget = widgets::preview(&resolver, &attachment, &style, &file)?;
            println!("{}", serde_json::to_string_pretty(&widget)?);
        }
        Command::Cropbox {
            attachment,
            style,
            file,
            width,
            backend,
        } => {
            let config = load_config()?;
            let attachment = find_attachment(&config, &attachment)?;
            match backend.backend {
                BackendKind::Rust => cropbox(
                    &RustBackend::new(),
                    &config,
                    &attachment,
                    &style,
                    &file,
                    width,
                )?,
                BackendKind::Magick => cropbox(
                    &MagickBackend::new(),
                    &config,
                    &attachment,
                    &style,
                    &file,
                    width,
                )?,
            }
        }
        Command::Command {
            attachment,
            style,
            file,
            crop,
            backend,
        } => {
            let config = load_config()?;
            let attachment = find_attachment(&config, &attachment)?;
            let tokens = match backend.backend {
                BackendKind::Rust => style_command(
                    &RustBackend::new(),
                    &config,
                    &attachment,
                    &style,
                    &file,
                    crop,
                )?,
                BackendKind::Magick => style_command(
                    &MagickBackend::new(),
                    &config,
                    &attachment,
                    &style,
                    &file,
                    crop,
                )?,
            };
            println!("{}", output::format_command(&tokens));
        }
        Command::Crop {
            attachment,
            file,
            form,
            backend,
        } => {
            let config = load_config()?;
            let attachment = find_attachment(&config, &attachment)?;
            let fields = read_form(&form)?;
            match backend.backend {
                BackendKind::Rust => crop(
                    &RustBackend::new(),
                    &config,
                    attachment,
                    &file,
                    fields,
                )?,
                BackendKind::Magick => crop(
                    &MagickBackend::new(),
                    &config,
                    attachment,
                    &file,
                    fields,
                )?,
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn find_attachment(config: &CropConfig, name: &str) -> Result<Attachment, Box<dyn std::error::Error>> {
    config.attachment(name).ok_or_else(|| {
        let known: Vec<&str> = config.attachments.keys().map(String::as_str).collect();
        format!("attachment '{name}' is not configured (known: {})", known.join(", ")).into()
    })
}

/// Form fields as name → string value. Numbers and booleans are stringified,
/// `null` becomes blank.
fn read_form(path: &Path) -> Result<Vec<(String, String)>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)?;
    Ok(object
        .into_iter()
        .map(|(name, value)| {
            let raw = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (name, raw)
        })
        .collect())
}

fn cropbox<B: ImageBackend>(
    backend: &B,
    config: &CropConfig,
    attachment: &Attachment,
    style: &str,
    file: &str,
    width: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let resolver = GeometryResolver::new(backend, &config.storage);
    let widget = widgets::cropbox(&resolver, attachment, style, file, width)?;
    println!("{}", serde_json::to_string_pretty(&widget)?);
    Ok(())
}

fn style_command<B: ImageBackend>(
    backend: &B,
    config: &CropConfig,
    attachment: &Attachment,
    style: &str,
    file: &str,
    crop: Option<CropRect>,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let pipeline = ImagePipeline::new(backend, &config.storage)?;
    let base = pipeline.base_command(attachment, style, file)?;

    let mut store = CropAttributes::new();
    if let Some(rect) = crop {
        let values = [rect.x, rect.y, rect.w, rect.h];
        for (suffix, value) in CropSuffix::RECTANGLE.into_iter().zip(values) {
            store.set(&attachment.name, style, suffix, Some(AttrValue::Integer(value)));
        }
        let original = pipeline.resolver().original_geometry(attachment, file)?;
        store.set(&attachment.name, style, CropSuffix::OriginalW, Some(original.width.into()));
        store.set(&attachment.name, style, CropSuffix::OriginalH, Some(original.height.into()));
    }

    let fragment =
        command::crop_fragment(&store, &attachment.name, style, config.cropping.bounds)?;
    Ok(command::compose(base, fragment.as_ref()))
}

fn crop<B: ImageBackend>(
    backend: &B,
    config: &CropConfig,
    attachment: Attachment,
    file: &str,
    fields: Vec<(String, String)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let name = attachment.name.clone();
    let mut record = MemoryRecord::new().with_attachment(attachment, file);
    let form = record.apply_form_fields(fields);

    let pipeline = ImagePipeline::new(backend, &config.storage)?;
    let mut coordinator = ReprocessCoordinator::new(&pipeline, config.cropping.bounds);
    let outcome = coordinator.after_update(&mut record, &name)?;

    output::print_crop_output(&name, &form, &outcome, &config.storage);
    Ok(())
}
