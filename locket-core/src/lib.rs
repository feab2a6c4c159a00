//! Core print-layout and rendering engine for locket photo prints.
//!
//! This crate turns one photo, a crop shape and the user's zoom/pan into a tiled print sheet,
//! then encodes and delivers it at preview or print resolution.

/// Shape-clipped cell rendering.
pub mod compositor;
/// Native sink and download fallback for finished files.
pub mod delivery;
/// Export pipeline with its single in-flight guard.
pub mod export;
/// Checkout preview thumbnail and its cache.
pub mod preview;
/// Editing session state.
pub mod session;
/// Greedy sheet layout and tiling.
pub mod sheet;
/// Zoom, pan and the visible source rectangle.
pub mod transform;
/// Live editor frame rendering.
pub mod viewport;

pub use compositor::{CellRect, FitRect, RenderError, SourcePixmap, cover_fit, render_cell};
pub use delivery::{Delivery, DeliveryMethod, DownloadTarget, FileSink, ObjectUrl};
pub use export::{ExportError, ExportPipeline, ExportReport, ExportTicket, ExportTier};
pub use preview::{
    FilePreviewStore, PreviewOutcome, PreviewStore, PreviewZoom, SessionPreviewStore,
    generate_preview,
};
pub use session::{EditingSession, LoadedImage, SessionError};
pub use sheet::{Cell, Sheet, SheetSpec, render_sheet, tile_sheet};
pub use transform::{
    GestureState, MAX_SCALE, MIN_SCALE, SourceRect, ViewTransform, cover_scale, touch_distance,
};
pub use viewport::render_viewport;
