//! File delivery backends that write into a local directory.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::{Context, Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use locket_core::{DownloadTarget, FileSink, ObjectUrl};
use locket_utils::write_bytes;
use log::{debug, info, warn};

/// Keep only the final path component so a file name cannot escape the target directory.
fn target_path(dir: &Path, file_name: &str) -> Result<PathBuf> {
    let name = Path::new(file_name)
        .file_name()
        .ok_or_else(|| anyhow!("invalid file name '{file_name}'"))?;
    Ok(dir.join(name))
}

/// Native sink that decodes the base64 payload and saves it, like a mobile wrapper writing to
/// the Downloads folder.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FileSink for DirectorySink {
    fn save_file(&self, base64_payload: &str, file_name: &str, mime_type: &str) -> Result<()> {
        let bytes = BASE64
            .decode(base64_payload)
            .context("native sink received an invalid base64 payload")?;
        let path = target_path(&self.dir, file_name)?;
        write_bytes(&path, &bytes)?;
        info!("Saved {} ({mime_type}) to {}", file_name, path.display());
        Ok(())
    }
}

/// Browser-style download flow: object URLs are in-memory blobs and clicking one writes it out.
pub struct DirectoryDownloads {
    dir: PathBuf,
    next_id: AtomicUsize,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_id: AtomicUsize::new(1),
            blobs: Mutex::new(HashMap::new()),
        }
    }

    /// Object URLs created and not yet revoked.
    pub fn live_urls(&self) -> usize {
        self.blobs.lock().map(|blobs| blobs.len()).unwrap_or(0)
    }
}

impl Drop for DirectoryDownloads {
    fn drop(&mut self) {
        let live = self.live_urls();
        if live > 0 {
            warn!("{live} object URL(s) were never revoked");
        }
    }
}

impl DownloadTarget for DirectoryDownloads {
    fn create_object_url(&self, bytes: Vec<u8>, mime_type: &str) -> Result<ObjectUrl> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let url = format!("blob:locket/{id}");
        debug!("Created {url} for {} byte {mime_type}", bytes.len());
        self.blobs
            .lock()
            .map_err(|_| anyhow!("download registry lock poisoned"))?
            .insert(url.clone(), bytes);
        Ok(ObjectUrl::new(url))
    }

    fn click_anchor(&self, url: &ObjectUrl, file_name: &str) -> Result<()> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| anyhow!("download registry lock poisoned"))?;
        let bytes = blobs
            .get(url.as_str())
            .ok_or_else(|| anyhow!("object URL {} was revoked", url.as_str()))?;
        let path = target_path(&self.dir, file_name)?;
        write_bytes(&path, bytes)?;
        info!("Downloaded {}", path.display());
        Ok(())
    }

    fn revoke_object_url(&self, url: ObjectUrl) {
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.remove(url.as_str());
        }
    }
}
