//! Command-line argument definitions for locket-cli.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use locket_utils::{CropShape, ExportFormat};
use std::path::PathBuf;

/// Crop a photo into a shape and lay it out on a 4x6 print sheet.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional settings JSON. Defaults to `config/locket_settings.json` when present, otherwise built-in values.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable telemetry timing logs (defaults to settings file).
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub telemetry: bool,

    /// Override telemetry logging level (error, warn, info, debug, trace).
    #[arg(long, global = true, value_name = "LEVEL")]
    pub telemetry_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render the print sheet at print resolution and deliver it as PNG or PDF.
    Export(ExportArgs),
    /// Render the checkout preview thumbnail and cache its data URL.
    Preview(PreviewArgs),
    /// Print the planned cell layout as JSON without rendering.
    Layout(LayoutArgs),
    /// Render the editor frame as the user would see it.
    Viewport(ViewportArgs),
}

/// Photo and crop adjustments shared by every rendering command.
#[derive(Debug, Args)]
pub struct EditArgs {
    /// Path to the source photo.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Crop shape (square, circle, oval, heart). Defaults to the settings file.
    #[arg(long)]
    pub shape: Option<CropShape>,

    /// Absolute zoom applied after the cover fit (clamped to 0.1-5.0).
    #[arg(long)]
    pub scale: Option<f32>,

    /// Zoom button presses; negative values zoom out.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub zoom_steps: i32,

    /// Horizontal pan in viewport pixels.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub offset_x: f32,

    /// Vertical pan in viewport pixels.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub offset_y: f32,
}

/// How finished files reach the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeliveryMode {
    /// Hand a base64 payload to a native file sink.
    Native,
    /// Object URL and anchor click, as a browser download.
    Download,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub edit: EditArgs,

    /// Output format (png or pdf). Defaults to the settings file.
    #[arg(long)]
    pub format: Option<ExportFormat>,

    /// Output resolution in dots per inch. Defaults to the settings file.
    #[arg(long, conflicts_with = "premium")]
    pub dpi: Option<u32>,

    /// Export at the premium 1200 DPI tier.
    #[arg(long, action = ArgAction::SetTrue)]
    pub premium: bool,

    /// Directory delivered files are written to.
    #[arg(short, long, default_value = "downloads")]
    pub output_dir: PathBuf,

    /// Delivery route for the finished file.
    #[arg(long, value_enum, default_value_t = DeliveryMode::Download)]
    pub delivery: DeliveryMode,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub edit: EditArgs,

    /// Also write the thumbnail JPEG to this path.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory backing the preview cache.
    #[arg(long, default_value = "config/preview_cache")]
    pub cache_dir: PathBuf,

    /// Preview zoom presses from the default 0.2 (negative zooms out).
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub preview_zoom_steps: i32,

    /// Write the preview as displayed at the chosen zoom to this PNG.
    #[arg(long)]
    pub display: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct LayoutArgs {
    /// Crop shape to plan for. Defaults to the settings file.
    #[arg(long)]
    pub shape: Option<CropShape>,

    /// Resolution in dots per inch. Defaults to the settings file.
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Plan the trim-sized sheet without bleed.
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_bleed: bool,

    /// Write the layout to a JSON file instead of stdout.
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ViewportArgs {
    #[command(flatten)]
    pub edit: EditArgs,

    /// PNG file to write.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Frame width in pixels. Defaults to the editor viewport width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Frame height in pixels. Defaults to the editor viewport height.
    #[arg(long)]
    pub height: Option<u32>,
}
