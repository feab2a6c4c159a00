//! Handing finished files to the user.
//!
//! A host may provide a native [`FileSink`] (a mobile wrapper saving to Downloads, for example).
//! When it does not, files go through a [`DownloadTarget`] that mimics the browser flow: wrap the
//! bytes in an object URL, click an anchor pointing at it, then revoke the URL.

use anyhow::Result;
use log::{debug, warn};

/// Native file saving provided by the host.
pub trait FileSink {
    /// Persist a file given as a base64 payload (no data-URL prefix).
    fn save_file(&self, base64_payload: &str, file_name: &str, mime_type: &str) -> Result<()>;
}

/// Handle to bytes registered with a [`DownloadTarget`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Blob-and-anchor download flow used when no native sink exists.
pub trait DownloadTarget {
    fn create_object_url(&self, bytes: Vec<u8>, mime_type: &str) -> Result<ObjectUrl>;
    fn click_anchor(&self, url: &ObjectUrl, file_name: &str) -> Result<()>;
    fn revoke_object_url(&self, url: ObjectUrl);
}

/// Which route a delivered file took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMethod {
    NativeSink,
    Download,
}

/// Delivery route resolved once when the host starts.
pub struct Delivery {
    sink: Option<Box<dyn FileSink>>,
    fallback: Box<dyn DownloadTarget>,
}

impl Delivery {
    pub fn new(sink: Option<Box<dyn FileSink>>, fallback: Box<dyn DownloadTarget>) -> Self {
        Self { sink, fallback }
    }

    pub fn download_only(fallback: Box<dyn DownloadTarget>) -> Self {
        Self::new(None, fallback)
    }

    pub fn has_native_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Deliver `bytes` under `file_name`.
    ///
    /// The object URL created on the download route is revoked even when the click fails.
    pub fn deliver(
        &self,
        bytes: &[u8],
        file_name: &str,
        mime_type: &str,
    ) -> Result<DeliveryMethod> {
        if let Some(sink) = &self.sink {
            let payload = locket_utils::output::base64_payload(bytes);
            sink.save_file(&payload, file_name, mime_type)?;
            debug!("Saved {file_name} through native sink");
            return Ok(DeliveryMethod::NativeSink);
        }

        let url = self.fallback.create_object_url(bytes.to_vec(), mime_type)?;
        let clicked = self.fallback.click_anchor(&url, file_name);
        if let Err(err) = &clicked {
            warn!("Download of {file_name} failed: {err}");
        }
        self.fallback.revoke_object_url(url);
        clicked?;
        debug!("Downloaded {file_name}");
        Ok(DeliveryMethod::Download)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Log {
        events: Vec<String>,
    }

    struct RecordingSink(Arc<Mutex<Log>>);

    impl FileSink for RecordingSink {
        fn save_file(&self, payload: &str, file_name: &str, mime_type: &str) -> Result<()> {
            let mut log = self.0.lock().expect("lock");
            log.events.push(format!("save {file_name} {mime_type} {payload}"));
            Ok(())
        }
    }

    struct RecordingTarget {
        log: Arc<Mutex<Log>>,
        fail_click: bool,
    }

    impl DownloadTarget for RecordingTarget {
        fn create_object_url(&self, bytes: Vec<u8>, mime_type: &str) -> Result<ObjectUrl> {
            let mut log = self.log.lock().expect("lock");
            log.events.push(format!("create {mime_type} {}", bytes.len()));
            Ok(ObjectUrl::new("blob:1"))
        }

        fn click_anchor(&self, url: &ObjectUrl, file_name: &str) -> Result<()> {
            let mut log = self.log.lock().expect("lock");
            log.events.push(format!("click {} {file_name}", url.as_str()));
            anyhow::ensure!(!self.fail_click, "popup blocked");
            Ok(())
        }

        fn revoke_object_url(&self, url: ObjectUrl) {
            let mut log = self.log.lock().expect("lock");
            log.events.push(format!("revoke {}", url.as_str()));
        }
    }

    fn target(log: &Arc<Mutex<Log>>, fail_click: bool) -> Box<dyn DownloadTarget> {
        Box::new(RecordingTarget {
            log: Arc::clone(log),
            fail_click,
        })
    }

    #[test]
    fn native_sink_receives_base64_payload() {
        let log = Arc::new(Mutex::new(Log::default()));
        let delivery = Delivery::new(
            Some(Box::new(RecordingSink(Arc::clone(&log)))),
            target(&log, false),
        );
        let method = delivery
            .deliver(b"hi", "a.png", "image/png")
            .expect("deliver");

        assert_eq!(method, DeliveryMethod::NativeSink);
        assert_eq!(log.lock().expect("lock").events, vec!["save a.png image/png aGk="]);
    }

    #[test]
    fn download_creates_clicks_and_revokes() {
        let log = Arc::new(Mutex::new(Log::default()));
        let delivery = Delivery::download_only(target(&log, false));
        assert!(!delivery.has_native_sink());
        let method = delivery
            .deliver(&[1, 2, 3], "a.pdf", "application/pdf")
            .expect("deliver");

        assert_eq!(method, DeliveryMethod::Download);
        assert_eq!(
            log.lock().expect("lock").events,
            vec!["create application/pdf 3", "click blob:1 a.pdf", "revoke blob:1"]
        );
    }

    #[test]
    fn failed_click_still_revokes() {
        let log = Arc::new(Mutex::new(Log::default()));
        let delivery = Delivery::download_only(target(&log, true));
        assert!(delivery.deliver(&[0], "a.png", "image/png").is_err());
        let recorded = log.lock().expect("lock");
        assert_eq!(
            recorded.events.last().map(String::as_str),
            Some("revoke blob:1")
        );
    }
}
