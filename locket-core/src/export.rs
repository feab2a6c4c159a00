//! Print-resolution export of the tiled sheet.

use std::sync::atomic::{AtomicBool, Ordering};

use image::RgbaImage;
use locket_utils::{
    AppSettings, ExportFormat, PREMIUM_DPI, STANDARD_DPI, encode_pdf, encode_png,
    output::PdfPage, timing_guard,
};
use log::{Level, info, warn};
use thiserror::Error;

use crate::compositor::RenderError;
use crate::delivery::{Delivery, DeliveryMethod};
use crate::preview::{PreviewOutcome, PreviewStore, generate_preview};
use crate::session::EditingSession;
use crate::sheet::{SheetSpec, render_sheet};

/// Errors surfaced by preview and export requests.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("an export is already in progress")]
    Busy,
    #[error("no image loaded")]
    NoImage,
    #[error("failed to render sheet: {0}")]
    Render(#[from] RenderError),
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to deliver {file_name}: {source}")]
    Delivery {
        file_name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Resolutions offered for download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTier {
    Standard,
    Premium,
}

impl ExportTier {
    pub fn dpi(self) -> u32 {
        match self {
            ExportTier::Standard => STANDARD_DPI,
            ExportTier::Premium => PREMIUM_DPI,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExportTier::Standard => "standard",
            ExportTier::Premium => "premium",
        }
    }

    /// The offered tier printed at `dpi`, if any.
    pub fn from_dpi(dpi: u32) -> Option<Self> {
        match dpi {
            STANDARD_DPI => Some(ExportTier::Standard),
            PREMIUM_DPI => Some(ExportTier::Premium),
            _ => None,
        }
    }
}

/// Summary of a finished export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub file_name: String,
    pub format: ExportFormat,
    pub dpi: u32,
    /// Offered tier matching `dpi`; `None` for custom resolutions.
    pub tier: Option<ExportTier>,
    pub width_px: u32,
    pub height_px: u32,
    pub cell_count: usize,
    pub byte_len: usize,
    pub method: DeliveryMethod,
}

/// Marks an export as in flight until dropped.
pub struct ExportTicket<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ExportTicket<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Renders, encodes and delivers sheets; also produces the checkout preview.
pub struct ExportPipeline {
    settings: AppSettings,
    delivery: Delivery,
    preview_store: Box<dyn PreviewStore>,
    in_flight: AtomicBool,
}

impl ExportPipeline {
    pub fn new(
        settings: AppSettings,
        delivery: Delivery,
        preview_store: Box<dyn PreviewStore>,
    ) -> Self {
        Self {
            settings,
            delivery,
            preview_store,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn preview_store(&self) -> &dyn PreviewStore {
        self.preview_store.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim the single export slot. Fails with [`ExportError::Busy`] while another ticket lives.
    pub fn begin_export(&self) -> Result<ExportTicket<'_>, ExportError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ExportError::Busy)?;
        Ok(ExportTicket {
            flag: &self.in_flight,
        })
    }

    /// Tile the session at `dpi` with bleed, encode it as `format` and deliver it.
    pub fn export_sheet(
        &self,
        session: &EditingSession,
        format: ExportFormat,
        dpi: u32,
    ) -> Result<ExportReport, ExportError> {
        let _ticket = self.begin_export()?;
        let image = session.image().ok_or(ExportError::NoImage)?;
        info!(
            "Generating {dpi} DPI {} for {} crop",
            format.extension().to_uppercase(),
            session.shape()
        );

        let spec = SheetSpec::new(&self.settings.sheet, dpi, true)?;
        let source_rect = session.source_rect();
        let sheet = render_sheet(&spec, image.source(), session.shape(), &source_rect)?;
        let bytes = self
            .encode(&sheet.image, format, dpi)
            .map_err(|source| ExportError::Encode {
                what: format!("{dpi} dpi {format}"),
                source,
            })?;

        let file_name = self.settings.product.file_name(dpi, format);
        let method = self
            .delivery
            .deliver(&bytes, &file_name, format.mime_type())
            .map_err(|source| {
                warn!("Delivery of {file_name} failed: {source:#}");
                ExportError::Delivery {
                    file_name: file_name.clone(),
                    source,
                }
            })?;
        info!("Exported {file_name} ({} bytes)", bytes.len());

        Ok(ExportReport {
            file_name,
            format,
            dpi,
            tier: ExportTier::from_dpi(dpi),
            width_px: spec.width_px,
            height_px: spec.height_px,
            cell_count: sheet.cells.len(),
            byte_len: bytes.len(),
            method,
        })
    }

    /// Export at one of the offered tiers.
    pub fn export_tier(
        &self,
        session: &EditingSession,
        format: ExportFormat,
        tier: ExportTier,
    ) -> Result<ExportReport, ExportError> {
        self.export_sheet(session, format, tier.dpi())
    }

    /// Generate the checkout preview and cache its data URL.
    pub fn preview(&self, session: &EditingSession) -> Result<PreviewOutcome, ExportError> {
        generate_preview(
            session,
            &self.settings.sheet,
            &self.settings.preview,
            self.preview_store.as_ref(),
        )
    }

    fn encode(
        &self,
        image: &RgbaImage,
        format: ExportFormat,
        dpi: u32,
    ) -> anyhow::Result<Vec<u8>> {
        let _guard = timing_guard(format!("encode {format} at {dpi} dpi"), Level::Debug);
        match format {
            ExportFormat::Png => {
                encode_png(image, self.settings.export.png_compression(), Some(dpi))
            }
            ExportFormat::Pdf => encode_pdf(
                image,
                PdfPage {
                    trim_width_in: self.settings.sheet.width_in,
                    trim_height_in: self.settings.sheet.height_in,
                    bleed_in: self.settings.sheet.bleed_in,
                },
            ),
        }
    }
}
