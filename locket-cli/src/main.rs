mod args;
mod config;
mod sinks;

use std::{fs, path::Path};

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use clap::Parser;
use locket_core::{
    Delivery, DeliveryMethod, EditingSession, ExportPipeline, FileSink, FilePreviewStore,
    PreviewZoom, SessionPreviewStore, SheetSpec, render_viewport,
};
use locket_utils::{
    AppSettings, CropShape, PngCompression, configure_telemetry, encode_png, init_logging,
    normalize_path, resize_exact, write_bytes,
};
use log::{info, warn};
use serde::Serialize;

use crate::{
    args::{
        Cli, Command, DeliveryMode, EditArgs, ExportArgs, LayoutArgs, PreviewArgs, ViewportArgs,
    },
    config::{apply_cli_overrides, load_settings},
    sinks::{DirectoryDownloads, DirectorySink},
};

#[derive(Debug, Serialize)]
struct ExportSummary {
    file: String,
    format: String,
    dpi: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tier: Option<&'static str>,
    width_px: u32,
    height_px: u32,
    cells: usize,
    bytes: usize,
    delivery: &'static str,
}

#[derive(Debug, Serialize)]
struct PreviewSummary {
    cache_key: String,
    cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<String>,
    data_url_bytes: usize,
    zoom: f32,
    display_size: (u32, u32),
    #[serde(skip_serializing_if = "Option::is_none")]
    display: Option<String>,
}

#[derive(Debug, Serialize)]
struct LayoutReport<'a> {
    shape: CropShape,
    aspect_ratio: f32,
    sheet: &'a SheetSpec,
    cells: Vec<locket_core::Cell>,
}

fn main() -> Result<()> {
    init_logging(log::LevelFilter::Info)?;
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_ref())?;
    apply_cli_overrides(&mut settings, &cli);
    configure_telemetry(
        settings.telemetry.enabled,
        settings.telemetry.level_filter(),
    );

    match &cli.command {
        Command::Export(args) => run_export(&settings, args),
        Command::Preview(args) => run_preview(&settings, args),
        Command::Layout(args) => run_layout(&settings, args),
        Command::Viewport(args) => run_viewport(&settings, args),
    }
}

/// Load the photo and replay the requested zoom and pan on top of the cover fit.
fn build_session(settings: &AppSettings, edit: &EditArgs) -> Result<EditingSession> {
    let input = normalize_path(&edit.input)?;
    let mut session = EditingSession::new(&settings.editor);
    session
        .load_image_path(&input)
        .with_context(|| format!("failed to load {}", input.display()))?;

    let transform = session.transform_mut();
    if let Some(scale) = edit.scale {
        transform.set_scale(scale);
    }
    for _ in 0..edit.zoom_steps.unsigned_abs() {
        if edit.zoom_steps > 0 {
            transform.zoom_in();
        } else {
            transform.zoom_out();
        }
    }
    transform.pan_by(edit.offset_x, edit.offset_y);

    let rect = session.source_rect();
    info!(
        "Cropping {} at scale {:.4}: source ({:.1}, {:.1}) {:.1}x{:.1}",
        session.shape(),
        session.transform().scale(),
        rect.sx,
        rect.sy,
        rect.sw,
        rect.sh
    );
    Ok(session)
}

fn run_export(settings: &AppSettings, args: &ExportArgs) -> Result<()> {
    let session = build_session(settings, &args.edit)?;

    let sink: Option<Box<dyn FileSink>> = match args.delivery {
        DeliveryMode::Native => Some(Box::new(DirectorySink::new(&args.output_dir))),
        DeliveryMode::Download => None,
    };
    let delivery = Delivery::new(sink, Box::new(DirectoryDownloads::new(&args.output_dir)));
    let pipeline = ExportPipeline::new(
        settings.clone(),
        delivery,
        Box::new(SessionPreviewStore::new()),
    );

    let report = pipeline
        .export_sheet(&session, settings.export.format, settings.export.dpi)
        .context("export failed")?;

    let summary = ExportSummary {
        file: args
            .output_dir
            .join(&report.file_name)
            .display()
            .to_string(),
        format: report.format.to_string(),
        dpi: report.dpi,
        tier: report.tier.map(|tier| tier.as_str()),
        width_px: report.width_px,
        height_px: report.height_px,
        cells: report.cell_count,
        bytes: report.byte_len,
        delivery: match report.method {
            DeliveryMethod::NativeSink => "native",
            DeliveryMethod::Download => "download",
        },
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_preview(settings: &AppSettings, args: &PreviewArgs) -> Result<()> {
    let session = build_session(settings, &args.edit)?;
    let pipeline = ExportPipeline::new(
        settings.clone(),
        Delivery::download_only(Box::new(DirectoryDownloads::new(&args.cache_dir))),
        Box::new(FilePreviewStore::new(&args.cache_dir)),
    );

    let outcome = pipeline.preview(&session).context("preview failed")?;
    if let Some(warning) = &outcome.cache_warning {
        warn!("{warning}");
    }

    let thumbnail = match &args.output {
        Some(path) => {
            write_data_url(&outcome.data_url, path)?;
            info!("Wrote preview thumbnail to {}", path.display());
            Some(path.display().to_string())
        }
        None => None,
    };

    let preview_sheet = SheetSpec::new(&settings.sheet, settings.preview.dpi, true)?;
    let zoom = PreviewZoom::stepped(args.preview_zoom_steps);
    let (display_width, display_height) =
        zoom.display_size(preview_sheet.width_px, preview_sheet.height_px);
    let display = match &args.display {
        Some(path) => {
            let shown = resize_exact(&outcome.thumbnail, display_width, display_height);
            write_bytes(path, &encode_png(&shown, PngCompression::Fast, None)?)?;
            info!(
                "Wrote {display_width}x{display_height} preview at zoom {:.3} to {}",
                zoom.value(),
                path.display()
            );
            Some(path.display().to_string())
        }
        None => None,
    };

    let summary = PreviewSummary {
        cache_key: settings.preview.cache_key.clone(),
        cached: outcome.is_cached(),
        warning: outcome.cache_warning.clone(),
        thumbnail,
        data_url_bytes: outcome.data_url.len(),
        zoom: zoom.value(),
        display_size: (display_width, display_height),
        display,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn write_data_url(data_url: &str, path: &Path) -> Result<()> {
    let (_, payload) = data_url
        .split_once(',')
        .context("preview data URL has no payload")?;
    let bytes = BASE64
        .decode(payload)
        .context("preview data URL is not valid base64")?;
    write_bytes(path, &bytes)
}

fn run_layout(settings: &AppSettings, args: &LayoutArgs) -> Result<()> {
    let shape = settings.editor.default_shape;
    let sheet = SheetSpec::new(&settings.sheet, settings.export.dpi, !args.no_bleed)?;
    let report = LayoutReport {
        shape,
        aspect_ratio: shape.aspect_ratio(),
        sheet: &sheet,
        cells: sheet.plan_cells(shape.aspect_ratio()),
    };
    info!(
        "Planned {} {} cells on a {}x{} sheet",
        report.cells.len(),
        shape,
        sheet.width_px,
        sheet.height_px
    );

    let json = serde_json::to_string_pretty(&report)?;
    match &args.json {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote layout to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_viewport(settings: &AppSettings, args: &ViewportArgs) -> Result<()> {
    let session = build_session(settings, &args.edit)?;
    let (viewport_width, viewport_height) = session.viewport();
    let width = viewport_width.round() as u32;
    let height = viewport_height.round() as u32;

    let frame = render_viewport(&session, width, height).context("viewport render failed")?;
    let bytes = encode_png(&frame, PngCompression::Default, None)?;
    write_bytes(&args.output, &bytes)?;
    info!(
        "Wrote {}x{} editor frame to {}",
        width,
        height,
        args.output.display()
    );
    Ok(())
}
