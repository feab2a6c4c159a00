//! Greedy layout of progressively larger cells onto the print sheet.
//!
//! The sheet is filled left to right, top to bottom, with one cell per millimetre step of the
//! height ramp (8 mm, 9 mm, ... 35 mm by default). Rows wrap when the next cell would cross the
//! right edge and the layout stops at the first cell that would cross the bottom edge.

use image::RgbaImage;
use locket_utils::{
    CropShape,
    config::{MM_PER_INCH, STANDARD_DPI, SheetSettings},
    timing_guard,
};
use log::{Level, debug};
use serde::Serialize;

use crate::compositor::{
    CellRect, RenderError, SourcePixmap, pixmap_to_rgba, render_cell, white_canvas,
};
use crate::transform::SourceRect;

/// A placed copy of the photo, in sheet pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cell {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Step of the size ramp this cell was generated from.
    pub height_mm: u32,
}

impl Cell {
    fn rect(&self) -> CellRect {
        CellRect {
            x: self.x as f32,
            y: self.y as f32,
            width: self.width as f32,
            height: self.height as f32,
        }
    }
}

/// Pixel geometry of a sheet at a given resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SheetSpec {
    pub dpi: u32,
    pub with_bleed: bool,
    pub width_px: u32,
    pub height_px: u32,
    /// Bleed band on every edge; zero without bleed.
    pub bleed_px: f64,
    /// Gap between cells and from the bleed line.
    pub margin_px: f64,
    pub min_cell_height_mm: u32,
    pub max_cell_height_mm: u32,
}

impl SheetSpec {
    pub fn new(settings: &SheetSettings, dpi: u32, with_bleed: bool) -> Result<Self, RenderError> {
        if dpi == 0 {
            return Err(RenderError::ZeroDpi);
        }
        let dpi_f = f64::from(dpi);
        let bleed_in = if with_bleed {
            f64::from(settings.bleed_in)
        } else {
            0.0
        };
        let width_in = f64::from(settings.width_in) + 2.0 * bleed_in;
        let height_in = f64::from(settings.height_in) + 2.0 * bleed_in;

        Ok(Self {
            dpi,
            with_bleed,
            // Fractional sizes truncate.
            width_px: (width_in * dpi_f).floor() as u32,
            height_px: (height_in * dpi_f).floor() as u32,
            bleed_px: bleed_in * dpi_f,
            margin_px: f64::from(settings.margin_px_at_600dpi) * dpi_f / f64::from(STANDARD_DPI),
            min_cell_height_mm: settings.min_cell_height_mm,
            max_cell_height_mm: settings.max_cell_height_mm,
        })
    }

    /// Geometry of the standard 4x6 in sheet.
    pub fn standard(dpi: u32, with_bleed: bool) -> Result<Self, RenderError> {
        Self::new(&SheetSettings::default(), dpi, with_bleed)
    }

    /// Plan every cell for a shape of the given width:height ratio without rasterizing.
    pub fn plan_cells(&self, aspect_ratio: f32) -> Vec<Cell> {
        let aspect = f64::from(aspect_ratio);
        let right_limit = f64::from(self.width_px) - self.bleed_px;
        let bottom_limit = f64::from(self.height_px) - self.bleed_px;
        let row_start = self.margin_px + self.bleed_px;

        let mut cells = Vec::new();
        let mut x = row_start;
        let mut y = row_start;
        let mut max_row_height = 0.0_f64;

        for height_mm in self.min_cell_height_mm..=self.max_cell_height_mm {
            let height = f64::from(height_mm) / MM_PER_INCH * f64::from(self.dpi);
            let width = height * aspect;

            if x + width + self.margin_px > right_limit {
                y += max_row_height + self.margin_px;
                x = row_start;
                max_row_height = 0.0;
            }
            if y + height > bottom_limit {
                break;
            }

            cells.push(Cell {
                x,
                y,
                width,
                height,
                height_mm,
            });
            x += width + self.margin_px;
            max_row_height = max_row_height.max(height);
        }
        cells
    }
}

/// A rendered sheet together with the layout that produced it.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub image: RgbaImage,
    pub spec: SheetSpec,
    pub cells: Vec<Cell>,
}

/// Render the standard sheet for `shape` at `dpi`.
pub fn tile_sheet(
    image: &RgbaImage,
    shape: CropShape,
    source_rect: &SourceRect,
    dpi: u32,
    with_bleed: bool,
) -> Result<Sheet, RenderError> {
    let spec = SheetSpec::standard(dpi, with_bleed)?;
    let source = SourcePixmap::from_rgba(image)?;
    render_sheet(&spec, &source, shape, source_rect)
}

/// Render a sheet with explicit geometry from an already prepared source.
pub fn render_sheet(
    spec: &SheetSpec,
    source: &SourcePixmap,
    shape: CropShape,
    source_rect: &SourceRect,
) -> Result<Sheet, RenderError> {
    let _guard = timing_guard(format!("render sheet at {} dpi", spec.dpi), Level::Debug);

    let cells = spec.plan_cells(shape.aspect_ratio());
    let mut canvas = white_canvas(spec.width_px, spec.height_px)?;
    for cell in &cells {
        render_cell(&mut canvas, source, cell.rect(), shape, source_rect)?;
    }
    debug!(
        "Tiled {} {} cells on a {}x{} sheet at {} dpi",
        cells.len(),
        shape,
        spec.width_px,
        spec.height_px,
        spec.dpi
    );

    Ok(Sheet {
        image: pixmap_to_rgba(&canvas),
        spec: *spec,
        cells,
    })
}
