//! The editing session: one photo, its crop shape and the user's zoom and pan.

use std::path::Path;

use image::RgbaImage;
use locket_utils::{
    CropShape, ImageLoadError,
    config::EditorSettings,
    decode_image, load_image,
};
use log::{debug, info};
use thiserror::Error;

use crate::compositor::{RenderError, SourcePixmap};
use crate::transform::{GestureState, SourceRect, ViewTransform};

/// Failures while replacing the session image. The previous image stays active.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] ImageLoadError),
    #[error("failed to prepare image for rendering: {0}")]
    Prepare(#[from] RenderError),
}

/// A decoded photo and its premultiplied render copy.
pub struct LoadedImage {
    rgba: RgbaImage,
    source: SourcePixmap,
}

impl LoadedImage {
    fn new(rgba: RgbaImage) -> Result<Self, RenderError> {
        let source = SourcePixmap::from_rgba(&rgba)?;
        Ok(Self { rgba, source })
    }

    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    pub fn height(&self) -> u32 {
        self.rgba.height()
    }

    pub fn rgba(&self) -> &RgbaImage {
        &self.rgba
    }

    pub fn source(&self) -> &SourcePixmap {
        &self.source
    }
}

/// Editor state owned by a single user session.
pub struct EditingSession {
    image: Option<LoadedImage>,
    shape: CropShape,
    transform: ViewTransform,
    gestures: GestureState,
    viewport_width: f32,
    viewport_height: f32,
}

impl Default for EditingSession {
    fn default() -> Self {
        Self::new(&EditorSettings::default())
    }
}

impl EditingSession {
    pub fn new(settings: &EditorSettings) -> Self {
        Self {
            image: None,
            shape: settings.default_shape,
            transform: ViewTransform::default(),
            gestures: GestureState::default(),
            viewport_width: settings.viewport_width,
            viewport_height: settings.viewport_height,
        }
    }

    /// Decode `bytes` and make them the session photo.
    ///
    /// Payloads that are not a recognized image format are rejected before decoding. On any
    /// error the previous image, shape and transform are left untouched.
    pub fn load_image_bytes(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let decoded = decode_image(bytes)?;
        self.replace_image(decoded)
    }

    pub fn load_image_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SessionError> {
        let path = path.as_ref();
        let decoded = load_image(path)?;
        info!(
            "Loaded {} ({}x{})",
            path.display(),
            decoded.width(),
            decoded.height()
        );
        self.replace_image(decoded)
    }

    /// Install an already decoded photo.
    pub fn set_image(&mut self, image: RgbaImage) -> Result<(), SessionError> {
        self.replace_image(image)
    }

    fn replace_image(&mut self, image: RgbaImage) -> Result<(), SessionError> {
        let loaded = LoadedImage::new(image)?;
        self.image = Some(loaded);
        self.reset();
        Ok(())
    }

    /// Restore cover fit and clear any pan. Does nothing without an image.
    pub fn reset(&mut self) {
        let Some(image) = &self.image else {
            return;
        };
        self.transform = ViewTransform::cover(
            image.width(),
            image.height(),
            self.viewport_width,
            self.viewport_height,
        );
        self.gestures = GestureState::default();
        debug!(
            "Reset view to scale {:.4} for {}x{} image",
            self.transform.scale(),
            image.width(),
            image.height()
        );
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn shape(&self) -> CropShape {
        self.shape
    }

    /// Change the crop shape; zoom and pan carry over.
    pub fn set_shape(&mut self, shape: CropShape) {
        self.shape = shape;
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut ViewTransform {
        &mut self.transform
    }

    pub fn viewport(&self) -> (f32, f32) {
        (self.viewport_width, self.viewport_height)
    }

    pub fn begin_drag(&mut self, x: f32, y: f32) {
        self.gestures.begin_drag(&self.transform, x, y);
    }

    pub fn drag_to(&mut self, x: f32, y: f32) {
        self.gestures.drag_to(&mut self.transform, x, y);
    }

    pub fn end_drag(&mut self) {
        self.gestures.end_drag();
    }

    pub fn begin_pinch(&mut self, distance: f32) {
        self.gestures.begin_pinch(&self.transform, distance);
    }

    pub fn pinch_to(&mut self, distance: f32) {
        self.gestures.pinch_to(&mut self.transform, distance);
    }

    pub fn end_pinch(&mut self) {
        self.gestures.end_pinch();
    }

    /// Visible part of the photo, or [`SourceRect::EMPTY`] before an image is loaded.
    pub fn source_rect(&self) -> SourceRect {
        match &self.image {
            Some(image) => self.transform.compute_source_rect(
                image.width(),
                image.height(),
                self.viewport_width,
                self.viewport_height,
                self.shape,
            ),
            None => SourceRect::EMPTY,
        }
    }
}
