//! Configuration loading and CLI override logic.

use std::path::PathBuf;

use anyhow::{Context, Result};
use locket_core::ExportTier;
use locket_utils::{
    config::{AppSettings, default_settings_path},
    normalize_path,
};
use log::info;

use crate::args::{Cli, Command};

/// Resolve the settings for this run.
///
/// An explicit `--config` must exist. Without one, `config/locket_settings.json` is used when
/// present and the built-in print defaults otherwise.
pub fn load_settings(config_path: Option<&PathBuf>) -> Result<AppSettings> {
    let path = match config_path {
        Some(path) => normalize_path(path)?,
        None => {
            let fallback = default_settings_path();
            if !fallback.exists() {
                return Ok(AppSettings::default());
            }
            fallback
        }
    };

    let settings = AppSettings::load_from_path(&path)
        .with_context(|| format!("cannot use print settings from {}", path.display()))?;
    info!(
        "Print settings from {}: {} DPI {} exports, {} default shape",
        path.display(),
        settings.export.dpi,
        settings.export.format,
        settings.editor.default_shape
    );
    Ok(settings)
}

/// Apply command-line arguments to override loaded or default settings.
pub fn apply_cli_overrides(settings: &mut AppSettings, cli: &Cli) {
    if cli.telemetry {
        settings.telemetry.enabled = true;
    }
    if let Some(level) = cli.telemetry_level.as_ref() {
        let normalized = level.trim();
        if !normalized.is_empty() {
            let lower = normalized.to_ascii_lowercase();
            settings.telemetry.level = lower.clone();
            if lower == "off" {
                settings.telemetry.enabled = false;
            }
        }
    }

    match &cli.command {
        Command::Export(args) => {
            if let Some(shape) = args.edit.shape {
                settings.editor.default_shape = shape;
            }
            if let Some(format) = args.format {
                settings.export.format = format;
            }
            if args.premium {
                settings.export.dpi = ExportTier::Premium.dpi();
            } else if let Some(dpi) = args.dpi {
                settings.export.dpi = dpi;
            }
        }
        Command::Preview(args) => {
            if let Some(shape) = args.edit.shape {
                settings.editor.default_shape = shape;
            }
        }
        Command::Viewport(args) => {
            if let Some(shape) = args.edit.shape {
                settings.editor.default_shape = shape;
            }
            // The rendered frame is the editor viewport, so the crop must be computed for it.
            if let Some(width) = args.width {
                settings.editor.viewport_width = width as f32;
            }
            if let Some(height) = args.height {
                settings.editor.viewport_height = height as f32;
            }
        }
        Command::Layout(args) => {
            if let Some(shape) = args.shape {
                settings.editor.default_shape = shape;
            }
            if let Some(dpi) = args.dpi {
                settings.export.dpi = dpi;
            }
        }
    }

    settings.sanitize();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use locket_utils::{CropShape, ExportFormat};

    #[test]
    fn export_overrides_replace_settings() {
        let cli = Cli::parse_from([
            "locket-cli",
            "--telemetry",
            "export",
            "--input",
            "photo.png",
            "--shape",
            "heart",
            "--format",
            "pdf",
            "--premium",
        ]);
        let mut settings = AppSettings::default();
        apply_cli_overrides(&mut settings, &cli);

        assert!(settings.telemetry.enabled);
        assert_eq!(settings.editor.default_shape, CropShape::Heart);
        assert_eq!(settings.export.format, ExportFormat::Pdf);
        assert_eq!(settings.export.dpi, 1200);
    }

    #[test]
    fn telemetry_off_disables_logging() {
        let cli = Cli::parse_from([
            "locket-cli",
            "--telemetry",
            "--telemetry-level",
            "OFF",
            "layout",
            "--dpi",
            "300",
        ]);
        let mut settings = AppSettings::default();
        apply_cli_overrides(&mut settings, &cli);

        assert!(!settings.telemetry.enabled);
        assert_eq!(settings.telemetry.level, "off");
        assert_eq!(settings.export.dpi, 300);
    }

    #[test]
    fn viewport_size_becomes_the_session_viewport() {
        let cli = Cli::parse_from([
            "locket-cli",
            "viewport",
            "--input",
            "photo.png",
            "--width",
            "320",
            "--height",
            "240",
            "--output",
            "frame.png",
        ]);
        let mut settings = AppSettings::default();
        apply_cli_overrides(&mut settings, &cli);

        let session = locket_core::EditingSession::new(&settings.editor);
        assert_eq!(session.viewport(), (320.0, 240.0));
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("print.json");
        std::fs::write(
            &path,
            r#"{ "export": { "dpi": 300, "format": "pdf" }, "editor": { "default_shape": "oval" } }"#,
        )
        .expect("write settings");

        let settings = load_settings(Some(&path)).expect("load");
        assert_eq!(settings.export.dpi, 300);
        assert_eq!(settings.export.format, ExportFormat::Pdf);
        assert_eq!(settings.editor.default_shape, CropShape::Oval);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let missing = PathBuf::from("definitely/not/here.json");
        assert!(load_settings(Some(&missing)).is_err());
    }
}
