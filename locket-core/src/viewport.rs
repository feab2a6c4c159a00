//! Raster of the live editor frame.

use image::RgbaImage;
use locket_utils::{ShapeBox, build_clip_path, timing_guard};
use log::Level;
use tiny_skia::{Color, FillRule, FilterQuality, Mask, Paint, PixmapPaint, Transform};

use crate::compositor::{RenderError, pixmap_to_rgba, white_canvas};
use crate::session::EditingSession;

/// Share of the shorter viewport side the crop frame occupies.
pub const FRAME_FILL: f32 = 0.9;

/// Render the editor as the user sees it: white surround, the crop frame centered at 90% of the
/// shorter side and filled black, and the photo drawn under the frame at the session's zoom and
/// pan around the viewport center.
pub fn render_viewport(
    session: &EditingSession,
    width: u32,
    height: u32,
) -> Result<RgbaImage, RenderError> {
    let _guard = timing_guard(format!("render viewport {width}x{height}"), Level::Trace);
    let mut canvas = white_canvas(width, height)?;

    let (w, h) = (width as f32, height as f32);
    let size = w.min(h) * FRAME_FILL;
    let frame = ShapeBox::new((w - size) / 2.0, (h - size) / 2.0, size, size);
    let Some(path) = build_clip_path(session.shape(), frame) else {
        return Ok(pixmap_to_rgba(&canvas));
    };

    let mut black = Paint::default();
    black.set_color(Color::BLACK);
    black.anti_alias = true;
    canvas.fill_path(&path, &black, FillRule::Winding, Transform::identity(), None);

    if let Some(image) = session.image() {
        let mut mask =
            Mask::new(width, height).ok_or(RenderError::CanvasAllocation { width, height })?;
        mask.fill_path(&path, FillRule::Winding, true, Transform::identity());

        let transform = session.transform();
        let scale = transform.scale();
        let (offset_x, offset_y) = transform.offset();
        let placement = Transform::from_row(
            scale,
            0.0,
            0.0,
            scale,
            w / 2.0 + offset_x - scale * image.width() as f32 / 2.0,
            h / 2.0 + offset_y - scale * image.height() as f32 / 2.0,
        );
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        canvas.draw_pixmap(0, 0, image.source().as_ref(), &paint, placement, Some(&mask));
    }

    Ok(pixmap_to_rgba(&canvas))
}
