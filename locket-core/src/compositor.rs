//! Shape-clipped drawing of the cropped photo into a single cell.
//!
//! tiny-skia has no clip stack, so each cell is rendered off-screen: a cell-sized pixmap is
//! filled black through the shape, the photo is drawn through an anti-aliased mask of the same
//! shape, and the result is blended onto the destination canvas.

use image::RgbaImage;
use locket_utils::{CropShape, ShapeBox, build_cell_path};
use thiserror::Error;
use tiny_skia::{
    Color, FillRule, FilterQuality, IntSize, Mask, Paint, Pixmap, PixmapPaint, PixmapRef,
    Transform,
};

use crate::transform::SourceRect;

/// Failures while rasterizing a sheet, a cell or the editor frame.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("resolution must be greater than zero")]
    ZeroDpi,
    #[error("cannot allocate a {width}x{height} canvas")]
    CanvasAllocation { width: u32, height: u32 },
    #[error("source image is empty")]
    EmptySource,
}

/// Destination rectangle of a cover-fitted draw, relative to the cell origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Scale `source` to cover a `dest_width` x `dest_height` box without distortion.
///
/// The overflowing dimension is centered, so the result always contains the box.
pub fn cover_fit(source: &SourceRect, dest_width: f32, dest_height: f32) -> FitRect {
    let source_ar = source.sw / source.sh;
    let dest_ar = dest_width / dest_height;

    if source_ar > dest_ar {
        let width = dest_height * source_ar;
        FitRect {
            x: (dest_width - width) / 2.0,
            y: 0.0,
            width,
            height: dest_height,
        }
    } else {
        let height = dest_width / source_ar;
        FitRect {
            x: 0.0,
            y: (dest_height - height) / 2.0,
            width: dest_width,
            height,
        }
    }
}

/// Premultiplied copy of the photo, prepared once and sampled by every cell.
pub struct SourcePixmap {
    pixmap: Pixmap,
}

impl SourcePixmap {
    pub fn from_rgba(image: &RgbaImage) -> Result<Self, RenderError> {
        let (width, height) = image.dimensions();
        let size = IntSize::from_wh(width, height).ok_or(RenderError::EmptySource)?;

        let mut data = Vec::with_capacity(image.as_raw().len());
        for pixel in image.pixels() {
            let [r, g, b, a] = pixel.0;
            data.extend_from_slice(&[
                premultiply(r, a),
                premultiply(g, a),
                premultiply(b, a),
                a,
            ]);
        }

        let pixmap =
            Pixmap::from_vec(data, size).ok_or(RenderError::CanvasAllocation { width, height })?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn as_ref(&self) -> PixmapRef<'_> {
        self.pixmap.as_ref()
    }
}

fn premultiply(channel: u8, alpha: u8) -> u8 {
    ((channel as u16 * alpha as u16 + 127) / 255) as u8
}

/// Allocate an opaque white canvas.
pub fn white_canvas(width: u32, height: u32) -> Result<Pixmap, RenderError> {
    let mut pixmap =
        Pixmap::new(width, height).ok_or(RenderError::CanvasAllocation { width, height })?;
    pixmap.fill(Color::WHITE);
    Ok(pixmap)
}

/// Convert a rendered canvas back into straight-alpha RGBA.
pub fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut raw = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let straight = pixel.demultiply();
        raw.extend_from_slice(&[
            straight.red(),
            straight.green(),
            straight.blue(),
            straight.alpha(),
        ]);
    }
    // Length always matches width * height * 4.
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), raw)
        .unwrap_or_else(|| RgbaImage::new(pixmap.width(), pixmap.height()))
}

/// Cell placement on the destination canvas, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Draw the `source_rect` region of `source`, clipped to `shape`, into `cell` on `canvas`.
///
/// The clip area is filled black first. A source rectangle with no area leaves just the black
/// shape. Cells with no area, or that cannot be rasterized, are skipped.
pub fn render_cell(
    canvas: &mut Pixmap,
    source: &SourcePixmap,
    cell: CellRect,
    shape: CropShape,
    source_rect: &SourceRect,
) -> Result<(), RenderError> {
    if !(cell.width > 0.0 && cell.height > 0.0) {
        return Ok(());
    }

    let origin_x = cell.x.floor();
    let origin_y = cell.y.floor();
    let frac_x = cell.x - origin_x;
    let frac_y = cell.y - origin_y;
    let local_w = ((cell.x + cell.width).ceil() - origin_x).max(1.0) as u32;
    let local_h = ((cell.y + cell.height).ceil() - origin_y).max(1.0) as u32;

    let bbox = ShapeBox::new(frac_x, frac_y, cell.width, cell.height);
    let Some(path) = build_cell_path(shape, bbox) else {
        return Ok(());
    };

    let mut local = Pixmap::new(local_w, local_h).ok_or(RenderError::CanvasAllocation {
        width: local_w,
        height: local_h,
    })?;
    let mut mask = Mask::new(local_w, local_h).ok_or(RenderError::CanvasAllocation {
        width: local_w,
        height: local_h,
    })?;
    mask.fill_path(&path, FillRule::Winding, true, Transform::identity());

    let mut black = Paint::default();
    black.set_color(Color::BLACK);
    black.anti_alias = true;
    local.fill_path(&path, &black, FillRule::Winding, Transform::identity(), None);

    if source_rect.is_drawable() {
        let fit = cover_fit(source_rect, cell.width, cell.height);
        let k = fit.width / source_rect.sw;
        let transform = Transform::from_row(
            k,
            0.0,
            0.0,
            k,
            frac_x + fit.x - source_rect.sx * k,
            frac_y + fit.y - source_rect.sy * k,
        );
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        local.draw_pixmap(0, 0, source.as_ref(), &paint, transform, Some(&mask));
    }

    canvas.draw_pixmap(
        origin_x as i32,
        origin_y as i32,
        local.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    Ok(())
}
