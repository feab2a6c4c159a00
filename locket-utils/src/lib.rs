//! Common helpers shared across the locket-print crates.

/// Application configuration and settings management.
pub mod config;
/// Source image loading and validation.
pub mod image_utils;
/// PNG, JPEG and PDF encoders plus file writing.
pub mod output;
/// Crop shape geometry and clip masks.
pub mod shape;
/// Instrumentation helpers for optional performance tracing.
pub mod telemetry;

use std::path::Path;

use anyhow::Result;
use log::LevelFilter;

pub use config::{AppSettings, ExportFormat, PREMIUM_DPI, STANDARD_DPI};
pub use image_utils::{ImageLoadError, decode_image, load_image, resize_exact};
pub use output::{PdfPage, PngCompression, encode_jpeg, encode_pdf, encode_png, write_bytes};
pub use shape::{CropShape, OVAL_ASPECT_RATIO, ShapeBox, build_cell_path, build_clip_path};
pub use telemetry::{
    TimingGuard, configure as configure_telemetry, telemetry_allows, telemetry_enabled,
    timing_guard, timing_guard_if,
};

/// Initialize logging once for CLI environments.
///
/// This function respects the `RUST_LOG` environment variable if it is set.
/// Otherwise, it falls back to the provided default filter level.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module(telemetry::TELEMETRY_TARGET, LevelFilter::Trace);

    if builder.try_init().is_err() {
        // Logger already initialized; nothing to do.
    }
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<std::path::PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    Ok(path.canonicalize()?)
}
