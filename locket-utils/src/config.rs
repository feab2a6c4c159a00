//! Shared configuration types consumed across the locket-print workspace.
//!
//! These structures describe the physical print sheet, the editor viewport, export defaults
//! and the preview thumbnail. They serialize to JSON so the CLI (and any other front end) can
//! load a settings file and layer command-line overrides on top.

use crate::{output::PngCompression, shape::CropShape};

use anyhow::{Context, Result};
use log::{LevelFilter, warn};
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Standard print resolution, also used for the on-screen preview.
pub const STANDARD_DPI: u32 = 600;
/// Premium print resolution offered for paid downloads.
pub const PREMIUM_DPI: u32 = 1200;
/// Millimetres per inch, used to convert the cell size ramp to pixels.
pub const MM_PER_INCH: f64 = 25.4;

/// Physical description of the print sheet and the cell size ramp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SheetSettings {
    /// Trim width in inches.
    pub width_in: f32,
    /// Trim height in inches.
    pub height_in: f32,
    /// Bleed added to every edge when bleed is requested, in inches.
    pub bleed_in: f32,
    /// Gap between cells in pixels at [`STANDARD_DPI`]; scaled for other resolutions.
    pub margin_px_at_600dpi: f32,
    /// Smallest cell height in millimetres.
    pub min_cell_height_mm: u32,
    /// Largest cell height in millimetres.
    pub max_cell_height_mm: u32,
}

impl Default for SheetSettings {
    fn default() -> Self {
        Self {
            width_in: 4.0,
            height_in: 6.0,
            bleed_in: 0.125,
            margin_px_at_600dpi: 20.0,
            min_cell_height_mm: 8,
            max_cell_height_mm: 35,
        }
    }
}

impl SheetSettings {
    /// Clamp values to sensible ranges.
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if !(self.width_in.is_finite() && self.width_in > 0.0) {
            self.width_in = defaults.width_in;
        }
        if !(self.height_in.is_finite() && self.height_in > 0.0) {
            self.height_in = defaults.height_in;
        }
        if !(self.bleed_in.is_finite() && self.bleed_in >= 0.0) {
            self.bleed_in = defaults.bleed_in;
        }
        if !(self.margin_px_at_600dpi.is_finite() && self.margin_px_at_600dpi >= 0.0) {
            self.margin_px_at_600dpi = defaults.margin_px_at_600dpi;
        }
        self.min_cell_height_mm = self.min_cell_height_mm.max(1);
        if self.max_cell_height_mm < self.min_cell_height_mm {
            self.max_cell_height_mm = self.min_cell_height_mm;
        }
    }
}

/// Editor viewport used to derive the visible source rectangle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorSettings {
    /// Viewport width in CSS pixels.
    pub viewport_width: f32,
    /// Viewport height in CSS pixels.
    pub viewport_height: f32,
    /// Shape selected when a session starts. Unknown names load as `Square`.
    #[serde(deserialize_with = "lenient_shape")]
    pub default_shape: CropShape,
}

fn lenient_shape<'de, D>(deserializer: D) -> std::result::Result<CropShape, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    let shape = CropShape::from_name(&name);
    if !name.trim().eq_ignore_ascii_case(shape.as_str()) {
        warn!("Unknown crop shape '{name}' in settings; using {shape}");
    }
    Ok(shape)
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            viewport_width: 500.0,
            viewport_height: 500.0,
            default_shape: CropShape::Square,
        }
    }
}

/// Output container for a finished print sheet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Png,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(format!(
                "invalid export format '{other}'; expected 'png' or 'pdf'"
            )),
        }
    }
}

/// Settings for full-resolution exports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportSettings {
    /// Format used when the caller does not pick one.
    pub format: ExportFormat,
    /// Resolution used when the caller does not pick one.
    pub dpi: u32,
    /// PNG compression strategy ("fast", "default", "best") or numeric level (0-9).
    pub png_compression: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            dpi: STANDARD_DPI,
            png_compression: "default".to_string(),
        }
    }
}

impl ExportSettings {
    pub fn png_compression(&self) -> PngCompression {
        PngCompression::parse(&self.png_compression)
    }
}

/// Settings for the low-resolution preview thumbnail handed to checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreviewSettings {
    /// Resolution the preview sheet is tiled at before downscaling.
    pub dpi: u32,
    /// Thumbnail width in pixels.
    pub thumbnail_width: u32,
    /// Thumbnail height in pixels.
    pub thumbnail_height: u32,
    /// JPEG quality (1-100).
    pub jpeg_quality: u8,
    /// Key the data URL is stored under.
    pub cache_key: String,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            dpi: STANDARD_DPI,
            thumbnail_width: 408,
            thumbnail_height: 600,
            jpeg_quality: 90,
            cache_key: "printPreviewDataUrl".to_string(),
        }
    }
}

impl PreviewSettings {
    /// Clamp values to sensible ranges.
    pub fn sanitize(&mut self) {
        self.dpi = self.dpi.max(1);
        self.thumbnail_width = self.thumbnail_width.max(1);
        self.thumbnail_height = self.thumbnail_height.max(1);
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        if self.cache_key.trim().is_empty() {
            self.cache_key = Self::default().cache_key;
        }
    }
}

/// Product naming used for delivered files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProductSettings {
    /// Prefix of every exported file name.
    pub name: String,
}

impl Default for ProductSettings {
    fn default() -> Self {
        Self {
            name: "locket-photo-print".to_string(),
        }
    }
}

impl ProductSettings {
    /// `<product-name>-<dpi>dpi.<ext>`
    pub fn file_name(&self, dpi: u32, format: ExportFormat) -> String {
        format!("{}-{}dpi.{}", self.name, dpi, format.extension())
    }
}

/// Settings controlling optional runtime telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Whether telemetry timing logs are enabled.
    pub enabled: bool,
    /// Logging level for telemetry output (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Resolve the configured level string into a `LevelFilter`.
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Debug,
        }
    }
}

/// Persistent application settings consumed by front ends.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppSettings {
    pub product: ProductSettings,
    pub sheet: SheetSettings,
    pub editor: EditorSettings,
    pub export: ExportSettings,
    pub preview: PreviewSettings,
    pub telemetry: TelemetrySettings,
}

impl AppSettings {
    /// Load settings from a JSON file. Missing sections fall back to defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: AppSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))?;
        settings.sanitize();
        Ok(settings)
    }

    /// Serialize settings to disk in pretty-printed JSON.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize settings JSON")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;
        Ok(())
    }

    pub fn sanitize(&mut self) {
        self.sheet.sanitize();
        self.preview.sanitize();
        if !(self.editor.viewport_width > 0.0 && self.editor.viewport_height > 0.0) {
            let defaults = EditorSettings::default();
            self.editor.viewport_width = defaults.viewport_width;
            self.editor.viewport_height = defaults.viewport_height;
        }
        self.export.dpi = self.export.dpi.max(1);
        if self.product.name.trim().is_empty() {
            self.product.name = ProductSettings::default().name;
        }
    }
}

/// Returns the default path for persisted settings (`config/locket_settings.json`).
pub fn default_settings_path() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join("config/locket_settings.json"))
        .unwrap_or_else(|_| PathBuf::from("config/locket_settings.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn default_settings_round_trip() {
        let file = NamedTempFile::new().expect("tempfile");
        let settings = AppSettings::default();
        settings.save_to_path(file.path()).expect("save");

        let loaded = AppSettings::load_from_path(file.path()).expect("load");
        assert_eq!(loaded.sheet, settings.sheet);
        assert_eq!(loaded.editor, settings.editor);
        assert_eq!(loaded.preview, settings.preview);
        assert_eq!(loaded.product, settings.product);
        assert_eq!(loaded.telemetry.level, settings.telemetry.level);
    }

    #[test]
    fn partial_json_uses_defaults_and_sanitizes() {
        let file = NamedTempFile::new().expect("tempfile");
        let json = r#"{
            "sheet": { "min_cell_height_mm": 20, "max_cell_height_mm": 10 },
            "editor": { "default_shape": "heart" },
            "preview": { "jpeg_quality": 0, "cache_key": "  " },
            "product": { "name": "" }
        }"#;
        fs::write(file.path(), json).expect("write custom settings");

        let loaded = AppSettings::load_from_path(file.path()).expect("load");
        assert_eq!(loaded.sheet.min_cell_height_mm, 20);
        assert_eq!(loaded.sheet.max_cell_height_mm, 20);
        assert_eq!(loaded.sheet.width_in, 4.0);
        assert_eq!(loaded.editor.default_shape, CropShape::Heart);
        assert_eq!(loaded.editor.viewport_width, 500.0);
        assert_eq!(loaded.preview.jpeg_quality, 1);
        assert_eq!(loaded.preview.cache_key, "printPreviewDataUrl");
        assert_eq!(loaded.product.name, "locket-photo-print");
        assert_eq!(loaded.export.dpi, STANDARD_DPI);
    }

    #[test]
    fn unknown_default_shape_loads_as_square() {
        let file = NamedTempFile::new().expect("tempfile");
        fs::write(
            file.path(),
            r#"{ "editor": { "default_shape": "hexagon", "viewport_width": 320 } }"#,
        )
        .expect("write custom settings");

        let loaded = AppSettings::load_from_path(file.path()).expect("load");
        assert_eq!(loaded.editor.default_shape, CropShape::Square);
        assert_eq!(loaded.editor.viewport_width, 320.0);

        let shape: EditorSettings =
            serde_json::from_str(r#"{ "default_shape": " Oval " }"#).expect("parse");
        assert_eq!(shape.default_shape, CropShape::Oval);
    }

    #[test]
    fn file_names_follow_product_pattern() {
        let product = ProductSettings::default();
        assert_eq!(
            product.file_name(1200, ExportFormat::Pdf),
            "locket-photo-print-1200dpi.pdf"
        );
        assert_eq!(
            product.file_name(600, ExportFormat::Png),
            "locket-photo-print-600dpi.png"
        );
    }

    #[test]
    fn export_format_parses() {
        assert_eq!("PDF".parse::<ExportFormat>(), Ok(ExportFormat::Pdf));
        assert!("tiff".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Png.mime_type(), "image/png");
    }

    #[test]
    fn telemetry_level_parses_variants() {
        let telemetry = TelemetrySettings {
            level: "TRACE".into(),
            ..TelemetrySettings::default()
        };
        assert_eq!(telemetry.level_filter(), LevelFilter::Trace);
        assert_eq!(TelemetrySettings::default().level_filter(), LevelFilter::Debug);
    }
}
