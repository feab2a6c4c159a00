//! Low-resolution print preview and the cache it is handed to checkout through.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result, anyhow};
use image::RgbaImage;
use locket_utils::{
    config::{PreviewSettings, SheetSettings},
    encode_jpeg,
    output::data_url,
    resize_exact, timing_guard,
};
use log::{Level, debug, warn};

use crate::export::ExportError;
use crate::session::EditingSession;
use crate::sheet::{SheetSpec, render_sheet};

/// Smallest on-screen zoom of the preview sheet.
pub const PREVIEW_MIN_ZOOM: f32 = 0.05;
/// Largest on-screen zoom of the preview sheet.
pub const PREVIEW_MAX_ZOOM: f32 = 2.0;
/// Zoom the preview opens at.
pub const PREVIEW_DEFAULT_ZOOM: f32 = 0.2;

/// String key/value store the preview data URL is written to.
pub trait PreviewStore {
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store scoped to one session, with an optional byte quota.
#[derive(Debug, Default)]
pub struct SessionPreviewStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl SessionPreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that refuses writes once keys plus values would exceed `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("preview store lock poisoned"))
    }
}

impl PreviewStore for SessionPreviewStore {
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.lock()?;
        if let Some(quota) = self.quota_bytes {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            anyhow::ensure!(
                needed <= quota,
                "storage quota exceeded ({needed} of {quota} bytes)"
            );
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Store that keeps one file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FilePreviewStore {
    dir: PathBuf,
}

impl FilePreviewStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        anyhow::ensure!(
            !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
            "invalid preview store key '{key}'"
        );
        Ok(self.dir.join(format!("{key}.txt")))
    }
}

impl PreviewStore for FilePreviewStore {
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        fs::write(&path, value).with_context(|| format!("failed to write {}", path.display()))
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}

/// On-screen zoom of the rendered preview sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewZoom(f32);

impl Default for PreviewZoom {
    fn default() -> Self {
        Self(PREVIEW_DEFAULT_ZOOM)
    }
}

impl PreviewZoom {
    pub fn value(self) -> f32 {
        self.0
    }

    pub fn zoom_in(&mut self) {
        self.0 = (self.0 * 1.2).clamp(PREVIEW_MIN_ZOOM, PREVIEW_MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.0 = (self.0 / 1.2).clamp(PREVIEW_MIN_ZOOM, PREVIEW_MAX_ZOOM);
    }

    /// Default zoom after `steps` presses of zoom in (positive) or zoom out (negative).
    pub fn stepped(steps: i32) -> Self {
        let mut zoom = Self::default();
        for _ in 0..steps.unsigned_abs() {
            if steps > 0 {
                zoom.zoom_in();
            } else {
                zoom.zoom_out();
            }
        }
        zoom
    }

    /// On-screen size of a `width` x `height` preview sheet at this zoom.
    pub fn display_size(self, width: u32, height: u32) -> (u32, u32) {
        let scale = |px: u32| ((px as f32 * self.0).round() as u32).max(1);
        (scale(width), scale(height))
    }
}

/// Result of generating the preview.
#[derive(Debug, Clone)]
pub struct PreviewOutcome {
    /// Downscaled sheet.
    pub thumbnail: RgbaImage,
    /// `data:image/jpeg;base64,...` form of the thumbnail.
    pub data_url: String,
    /// Set when the store rejected the data URL; the preview itself is still valid.
    pub cache_warning: Option<String>,
}

impl PreviewOutcome {
    pub fn is_cached(&self) -> bool {
        self.cache_warning.is_none()
    }
}

/// Render the bled sheet at preview resolution, shrink it to the thumbnail size, encode it as
/// JPEG and cache the data URL.
///
/// A cache failure is logged and reported in [`PreviewOutcome::cache_warning`].
pub fn generate_preview(
    session: &EditingSession,
    sheet: &SheetSettings,
    settings: &PreviewSettings,
    store: &dyn PreviewStore,
) -> Result<PreviewOutcome, ExportError> {
    let _guard = timing_guard("generate print preview", Level::Debug);
    let image = session.image().ok_or(ExportError::NoImage)?;

    let spec = SheetSpec::new(sheet, settings.dpi, true)?;
    let rendered = render_sheet(&spec, image.source(), session.shape(), &session.source_rect())?;
    let thumbnail = resize_exact(
        &rendered.image,
        settings.thumbnail_width,
        settings.thumbnail_height,
    );
    let jpeg = encode_jpeg(&thumbnail, settings.jpeg_quality).map_err(|source| {
        ExportError::Encode {
            what: "preview JPEG".to_string(),
            source,
        }
    })?;
    let data_url = data_url("image/jpeg", &jpeg);

    let cache_warning = match store.set(&settings.cache_key, &data_url) {
        Ok(()) => {
            debug!(
                "Cached {} byte preview under '{}'",
                data_url.len(),
                settings.cache_key
            );
            None
        }
        Err(err) => {
            warn!("Could not save print preview for checkout: {err:#}");
            Some(format!("Could not save print preview for checkout: {err}"))
        }
    };

    Ok(PreviewOutcome {
        thumbnail,
        data_url,
        cache_warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn session_store_round_trips_and_removes() {
        let store = SessionPreviewStore::new();
        assert_eq!(store.get("k").expect("get"), None);
        store.set("k", "v").expect("set");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("v"));
        store.remove("k").expect("remove");
        assert_eq!(store.get("k").expect("get"), None);
    }

    #[test]
    fn session_store_enforces_quota() {
        let store = SessionPreviewStore::with_quota(10);
        store.set("key", "1234567").expect("fits");
        assert!(store.set("key", "12345678").is_err());
        assert_eq!(store.get("key").expect("get").as_deref(), Some("1234567"));
    }

    #[test]
    fn file_store_persists_values() {
        let dir = tempdir().expect("tempdir");
        let store = FilePreviewStore::new(dir.path().join("cache"));
        store
            .set("printPreviewDataUrl", "data:image/jpeg;base64,AAAA")
            .expect("set");

        let reopened = FilePreviewStore::new(store.dir());
        assert_eq!(
            reopened.get("printPreviewDataUrl").expect("get").as_deref(),
            Some("data:image/jpeg;base64,AAAA")
        );
        reopened.remove("printPreviewDataUrl").expect("remove");
        reopened.remove("printPreviewDataUrl").expect("remove twice");
        assert_eq!(reopened.get("printPreviewDataUrl").expect("get"), None);
        assert!(store.set("../escape", "x").is_err());
    }

    #[test]
    fn preview_zoom_steps_and_clamps() {
        let mut zoom = PreviewZoom::default();
        assert_eq!(zoom.value(), 0.2);
        zoom.zoom_in();
        assert!((zoom.value() - 0.24).abs() < 1e-6);
        for _ in 0..50 {
            zoom.zoom_in();
        }
        assert_eq!(zoom.value(), PREVIEW_MAX_ZOOM);
        for _ in 0..100 {
            zoom.zoom_out();
        }
        assert_eq!(zoom.value(), PREVIEW_MIN_ZOOM);
    }

    #[test]
    fn stepped_zoom_sizes_the_displayed_sheet() {
        assert_eq!(PreviewZoom::stepped(0), PreviewZoom::default());
        assert_eq!(PreviewZoom::default().display_size(2550, 3750), (510, 750));

        let closer = PreviewZoom::stepped(2);
        assert!((closer.value() - 0.288).abs() < 1e-5);
        assert_eq!(closer.display_size(2550, 3750), (734, 1080));

        assert_eq!(PreviewZoom::stepped(-100).value(), PREVIEW_MIN_ZOOM);
        assert_eq!(PreviewZoom::stepped(-100).display_size(4, 4), (1, 1));
    }
}
