use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{ImageFormat, Rgba, RgbaImage};
use locket_core::{
    Delivery, DeliveryMethod, DownloadTarget, EditingSession, ExportError, ExportPipeline,
    ExportTier, FileSink, ObjectUrl, PreviewStore, SessionPreviewStore,
};
use locket_utils::{AppSettings, CropShape, ExportFormat};

#[derive(Default)]
struct DownloadState {
    next_id: usize,
    blobs: HashMap<String, Vec<u8>>,
    live_urls: HashSet<String>,
    created: usize,
    clicks: Vec<String>,
    revoked: usize,
    downloaded: Vec<(String, Vec<u8>)>,
}

#[derive(Clone, Default)]
struct CountingDownloads {
    state: Arc<Mutex<DownloadState>>,
    fail_clicks: bool,
}

impl DownloadTarget for CountingDownloads {
    fn create_object_url(&self, bytes: Vec<u8>, _mime_type: &str) -> anyhow::Result<ObjectUrl> {
        let mut state = self.state.lock().expect("lock");
        state.next_id += 1;
        let url = format!("blob:locket/{}", state.next_id);
        state.blobs.insert(url.clone(), bytes);
        state.live_urls.insert(url.clone());
        state.created += 1;
        Ok(ObjectUrl::new(url))
    }

    fn click_anchor(&self, url: &ObjectUrl, file_name: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().expect("lock");
        state.clicks.push(file_name.to_string());
        anyhow::ensure!(!self.fail_clicks, "download blocked");
        let bytes = state.blobs.get(url.as_str()).cloned().unwrap_or_default();
        state.downloaded.push((file_name.to_string(), bytes));
        Ok(())
    }

    fn revoke_object_url(&self, url: ObjectUrl) {
        let mut state = self.state.lock().expect("lock");
        state.live_urls.remove(url.as_str());
        state.blobs.remove(url.as_str());
        state.revoked += 1;
    }
}

#[derive(Clone, Default)]
struct RecordingSink {
    saved: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl FileSink for RecordingSink {
    fn save_file(&self, payload: &str, file_name: &str, mime_type: &str) -> anyhow::Result<()> {
        self.saved.lock().expect("lock").push((
            payload.to_string(),
            file_name.to_string(),
            mime_type.to_string(),
        ));
        Ok(())
    }
}

fn portrait_photo() -> Vec<u8> {
    let image = RgbaImage::from_fn(200, 300, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("encode photo");
    buffer.into_inner()
}

fn session(shape: CropShape) -> EditingSession {
    let mut session = EditingSession::default();
    session.set_shape(shape);
    session
        .load_image_bytes(&portrait_photo())
        .expect("load photo");
    session
}

#[test]
fn premium_download_uses_one_object_url_and_revokes_it() {
    let downloads = CountingDownloads::default();
    let pipeline = ExportPipeline::new(
        AppSettings::default(),
        Delivery::download_only(Box::new(downloads.clone())),
        Box::new(SessionPreviewStore::new()),
    );
    let session = session(CropShape::Circle);

    let report = pipeline
        .export_tier(&session, ExportFormat::Png, ExportTier::Premium)
        .expect("export");
    assert_eq!(report.file_name, "locket-photo-print-1200dpi.png");
    assert_eq!((report.width_px, report.height_px), (5100, 7500));
    assert_eq!(report.method, DeliveryMethod::Download);
    assert_eq!(report.tier, Some(ExportTier::Premium));
    assert!(report.cell_count > 0);

    let state = downloads.state.lock().expect("lock");
    assert_eq!(state.created, 1);
    assert_eq!(state.clicks, vec!["locket-photo-print-1200dpi.png".to_string()]);
    assert_eq!(state.revoked, 1);
    assert!(state.live_urls.is_empty());
    assert!(state.blobs.is_empty());

    let (_, bytes) = &state.downloaded[0];
    assert_eq!(bytes.len(), report.byte_len);
    let dimensions = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .expect("format")
        .into_dimensions()
        .expect("dimensions");
    assert_eq!(dimensions, (5100, 7500));
}

#[test]
fn native_sink_receives_pdf_as_base64() {
    let sink = RecordingSink::default();
    let downloads = CountingDownloads::default();
    let pipeline = ExportPipeline::new(
        AppSettings::default(),
        Delivery::new(Some(Box::new(sink.clone())), Box::new(downloads.clone())),
        Box::new(SessionPreviewStore::new()),
    );
    let session = session(CropShape::Heart);

    let report = pipeline
        .export_sheet(&session, ExportFormat::Pdf, 150)
        .expect("export");
    assert_eq!(report.method, DeliveryMethod::NativeSink);
    assert_eq!(report.tier, None);

    let saved = sink.saved.lock().expect("lock");
    assert_eq!(saved.len(), 1);
    let (payload, file_name, mime_type) = &saved[0];
    assert_eq!(file_name, "locket-photo-print-150dpi.pdf");
    assert_eq!(mime_type, "application/pdf");
    let pdf = BASE64.decode(payload).expect("base64");
    assert!(pdf.starts_with(b"%PDF-"));
    assert_eq!(pdf.len(), report.byte_len);

    assert_eq!(downloads.state.lock().expect("lock").created, 0);
}

#[test]
fn failed_delivery_releases_the_export_slot() {
    let downloads = CountingDownloads {
        fail_clicks: true,
        ..CountingDownloads::default()
    };
    let pipeline = ExportPipeline::new(
        AppSettings::default(),
        Delivery::download_only(Box::new(downloads.clone())),
        Box::new(SessionPreviewStore::new()),
    );
    let session = session(CropShape::Square);

    let err = pipeline
        .export_sheet(&session, ExportFormat::Png, 100)
        .expect_err("delivery fails");
    assert!(matches!(err, ExportError::Delivery { .. }));
    assert!(!pipeline.is_busy());

    let state = downloads.state.lock().expect("lock");
    assert_eq!(state.created, state.revoked);
    assert!(state.live_urls.is_empty());
}

#[test]
fn second_request_while_busy_is_rejected_not_queued() {
    let downloads = CountingDownloads::default();
    let pipeline = ExportPipeline::new(
        AppSettings::default(),
        Delivery::download_only(Box::new(downloads.clone())),
        Box::new(SessionPreviewStore::new()),
    );
    let session = session(CropShape::Oval);

    let ticket = pipeline.begin_export().expect("slot");
    let err = pipeline
        .export_sheet(&session, ExportFormat::Png, 100)
        .expect_err("busy");
    assert!(matches!(err, ExportError::Busy));
    drop(ticket);

    pipeline
        .export_sheet(&session, ExportFormat::Png, 100)
        .expect("export after release");
    assert_eq!(downloads.state.lock().expect("lock").created, 1);
}

#[test]
fn preview_is_cached_as_jpeg_data_url() {
    let pipeline = ExportPipeline::new(
        AppSettings::default(),
        Delivery::download_only(Box::new(CountingDownloads::default())),
        Box::new(SessionPreviewStore::new()),
    );
    let session = session(CropShape::Oval);

    let outcome = pipeline.preview(&session).expect("preview");
    assert!(outcome.is_cached());
    assert_eq!(outcome.thumbnail.dimensions(), (408, 600));
    assert!(outcome.data_url.starts_with("data:image/jpeg;base64,"));

    let cached = pipeline
        .preview_store()
        .get("printPreviewDataUrl")
        .expect("get")
        .expect("cached value");
    assert_eq!(cached, outcome.data_url);

    let again = pipeline.preview(&session).expect("preview");
    assert_eq!(again.data_url, outcome.data_url);
}

#[test]
fn preview_survives_a_full_store() {
    let pipeline = ExportPipeline::new(
        AppSettings::default(),
        Delivery::download_only(Box::new(CountingDownloads::default())),
        Box::new(SessionPreviewStore::with_quota(64)),
    );
    let session = session(CropShape::Square);

    let outcome = pipeline.preview(&session).expect("preview still succeeds");
    assert!(!outcome.is_cached());
    assert!(outcome.cache_warning.is_some());
    assert_eq!(
        pipeline
            .preview_store()
            .get("printPreviewDataUrl")
            .expect("get"),
        None
    );
}

#[test]
fn preview_without_image_is_rejected() {
    let pipeline = ExportPipeline::new(
        AppSettings::default(),
        Delivery::download_only(Box::new(CountingDownloads::default())),
        Box::new(SessionPreviewStore::new()),
    );
    assert!(matches!(
        pipeline.preview(&EditingSession::default()),
        Err(ExportError::NoImage)
    ));
}
