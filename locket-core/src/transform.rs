//! Pan/zoom state of the editor and the source rectangle it selects.
//!
//! [`ViewTransform`] holds the user's scale and pan offset over the loaded photo.
//! [`ViewTransform::compute_source_rect`] is the single definition of "what part of the photo
//! is inside the crop shape"; the live editor, the preview sheet and every export resolution
//! call it with the same inputs and therefore agree on the visible content.

use locket_utils::CropShape;
use serde::Serialize;

/// Smallest zoom factor the editor allows.
pub const MIN_SCALE: f32 = 0.1;
/// Largest zoom factor the editor allows.
pub const MAX_SCALE: f32 = 5.0;
/// Multiplicative step applied by the zoom buttons.
pub const ZOOM_STEP: f32 = 1.2;
/// Scale change per unit of wheel delta.
pub const WHEEL_SENSITIVITY: f32 = 0.001;

/// Region of the source image, in source pixels, that is visible through the crop shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceRect {
    pub sx: f32,
    pub sy: f32,
    pub sw: f32,
    pub sh: f32,
}

impl SourceRect {
    /// Rectangle with no area, used before an image is loaded.
    pub const EMPTY: SourceRect = SourceRect {
        sx: 0.0,
        sy: 0.0,
        sw: 0.0,
        sh: 0.0,
    };

    /// Whether there is anything to sample.
    pub fn is_drawable(&self) -> bool {
        self.sw > 0.0 && self.sh > 0.0 && self.sw.is_finite() && self.sh.is_finite()
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.sw / self.sh
    }
}

/// Clamp a requested zoom into `[MIN_SCALE, MAX_SCALE]`.
pub fn clamp_scale(scale: f32) -> f32 {
    if scale.is_nan() {
        return MIN_SCALE;
    }
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

/// Smallest scale at which an image fully covers the viewport.
pub fn cover_scale(image_width: u32, image_height: u32, viewport_width: f32, viewport_height: f32) -> f32 {
    let scale_x = viewport_width / image_width.max(1) as f32;
    let scale_y = viewport_height / image_height.max(1) as f32;
    scale_x.max(scale_y)
}

/// User-controlled zoom and pan over the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    scale: f32,
    offset_x: f32,
    offset_y: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl ViewTransform {
    /// Transform at cover scale with no pan, as applied on load and on reset.
    pub fn cover(
        image_width: u32,
        image_height: u32,
        viewport_width: f32,
        viewport_height: f32,
    ) -> Self {
        Self {
            scale: clamp_scale(cover_scale(
                image_width,
                image_height,
                viewport_width,
                viewport_height,
            )),
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> (f32, f32) {
        (self.offset_x, self.offset_y)
    }

    /// Set the zoom, clamped into `[MIN_SCALE, MAX_SCALE]`.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = clamp_scale(scale);
    }

    /// Set the pan offset. Any value is accepted, including one that moves the photo out of view.
    pub fn set_offset(&mut self, x: f32, y: f32) {
        self.offset_x = x;
        self.offset_y = y;
    }

    /// Add a drag delta to the pan offset.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    pub fn zoom_in(&mut self) {
        self.set_scale(self.scale * ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(self.scale / ZOOM_STEP);
    }

    /// Apply a wheel event; positive `delta_y` (scrolling down) zooms out.
    pub fn zoom_by_wheel(&mut self, delta_y: f32) {
        self.set_scale(self.scale - delta_y * WHEEL_SENSITIVITY);
    }

    /// Compute the visible source rectangle for the current zoom and pan.
    ///
    /// The binding viewport dimension (compared against the shape's aspect ratio) is divided
    /// by the scale; the other dimension follows from the aspect ratio. The rectangle is
    /// centered on the image center shifted by the pan offset in source pixels.
    pub fn compute_source_rect(
        &self,
        image_width: u32,
        image_height: u32,
        viewport_width: f32,
        viewport_height: f32,
        shape: CropShape,
    ) -> SourceRect {
        let crop_ar = shape.aspect_ratio();
        let viewport_ar = viewport_width / viewport_height;

        let (view_w, view_h) = if viewport_ar > crop_ar {
            let view_h = viewport_height / self.scale;
            (view_h * crop_ar, view_h)
        } else {
            let view_w = viewport_width / self.scale;
            (view_w, view_w / crop_ar)
        };

        let center_x = image_width as f32 / 2.0 - self.offset_x / self.scale;
        let center_y = image_height as f32 / 2.0 - self.offset_y / self.scale;

        SourceRect {
            sx: center_x - view_w / 2.0,
            sy: center_y - view_h / 2.0,
            sw: view_w,
            sh: view_h,
        }
    }
}

/// Pointer and pinch tracking for a single editor surface.
///
/// Drags are anchored (`pointer - offset` at press time) so every move event sets an absolute
/// offset. Pinches scale relative to the distance and zoom captured when two fingers landed.
#[derive(Debug, Clone, Default)]
pub struct GestureState {
    drag_anchor: Option<(f32, f32)>,
    pinch_start: Option<PinchStart>,
}

#[derive(Debug, Clone, Copy)]
struct PinchStart {
    distance: f32,
    scale: f32,
}

impl GestureState {
    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    /// Pointer (or single touch) pressed at `(x, y)`.
    pub fn begin_drag(&mut self, transform: &ViewTransform, x: f32, y: f32) {
        self.drag_anchor = Some((x - transform.offset_x, y - transform.offset_y));
    }

    /// Pointer moved; ignored unless a drag is in progress.
    pub fn drag_to(&mut self, transform: &mut ViewTransform, x: f32, y: f32) {
        if let Some((anchor_x, anchor_y)) = self.drag_anchor {
            transform.set_offset(x - anchor_x, y - anchor_y);
        }
    }

    /// Pointer released or left the surface.
    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    /// Two touches landed `distance` apart.
    pub fn begin_pinch(&mut self, transform: &ViewTransform, distance: f32) {
        self.pinch_start = Some(PinchStart {
            distance,
            scale: transform.scale,
        });
    }

    /// Two touches are now `distance` apart.
    pub fn pinch_to(&mut self, transform: &mut ViewTransform, distance: f32) {
        let Some(start) = self.pinch_start else {
            return;
        };
        if start.distance <= 0.0 {
            return;
        }
        transform.set_scale(start.scale * (distance / start.distance));
    }

    pub fn end_pinch(&mut self) {
        self.pinch_start = None;
    }
}

/// Distance between two touch points.
pub fn touch_distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}
