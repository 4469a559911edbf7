//! In-memory backend for development and testing.
//!
//! Uses `Mutex::unwrap()` intentionally. Lock poisoning only occurs when
//! another thread panicked while holding the lock, which is an unrecoverable
//! state. For real uploads, use [`crate::HttpBackend`].

use async_trait::async_trait;
use orbitcap_core::error::{CaptureError, Result};
use orbitcap_core::models::{CameraMetadata, TaskType};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::ports::{phase, CaptureBackend, ImageUpload, UploadAck};

/// Request observed by the [`MemoryBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CreateCapture { capture_id: String },
    UpdateCapture { capture_id: String, name: String, camera: CameraMetadata },
    UploadImage { capture_id: String, index: usize, id: u32, has_depth: bool },
    LockCapture { capture_id: String },
    CreateTask { capture_id: String, task: TaskType },
}

/// Recording backend that hands out sequential capture ids
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    calls: Arc<Mutex<Vec<BackendCall>>>,
    fail_on: Arc<Mutex<Option<&'static str>>>,
    upload_delay: Option<Duration>,
    next_id: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every image upload for `delay` before acknowledging it
    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = Some(delay);
        self
    }

    /// Fail every call of the given phase with a network error
    pub fn fail_on(&self, phase: &'static str) {
        *self.fail_on.lock().unwrap() = Some(phase);
    }

    /// Stop injecting failures
    pub fn recover(&self) {
        *self.fail_on.lock().unwrap() = None;
    }

    /// Every call received so far, in arrival order
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `create_capture` calls received
    pub fn creates(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, BackendCall::CreateCapture { .. })).count()
    }

    /// Indices of uploaded images, in arrival order
    pub fn uploaded_indices(&self) -> Vec<usize> {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                BackendCall::UploadImage { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }

    /// Highest number of image uploads that were in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn check(&self, phase: &'static str) -> Result<()> {
        if *self.fail_on.lock().unwrap() == Some(phase) {
            return Err(CaptureError::Network {
                phase: phase.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CaptureBackend for MemoryBackend {
    async fn create_capture(&self) -> Result<String> {
        self.check(phase::CREATE_CAPTURE)?;
        let capture_id = format!("capture-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.record(BackendCall::CreateCapture { capture_id: capture_id.clone() });
        Ok(capture_id)
    }

    async fn update_capture(&self, capture_id: &str, name: &str, camera: CameraMetadata) -> Result<()> {
        self.check(phase::UPDATE_CAPTURE)?;
        self.record(BackendCall::UpdateCapture {
            capture_id: capture_id.to_string(),
            name: name.to_string(),
            camera,
        });
        Ok(())
    }

    async fn upload_image(&self, capture_id: &str, image: &ImageUpload) -> Result<UploadAck> {
        self.check(phase::UPLOAD_IMAGE)?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.record(BackendCall::UploadImage {
            capture_id: capture_id.to_string(),
            index: image.index,
            id: image.id,
            has_depth: image.depth.is_some(),
        });
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(UploadAck { index: image.index, image_id: Some(format!("{}-img-{}", capture_id, image.index)) })
    }

    async fn lock_capture(&self, capture_id: &str) -> Result<()> {
        self.check(phase::LOCK_CAPTURE)?;
        self.record(BackendCall::LockCapture { capture_id: capture_id.to_string() });
        Ok(())
    }

    async fn create_task(&self, capture_id: &str, task: TaskType) -> Result<()> {
        self.check(phase::CREATE_TASK)?;
        self.record(BackendCall::CreateTask { capture_id: capture_id.to_string(), task });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.create_capture().await.unwrap(), "capture-1");
        assert_eq!(backend.create_capture().await.unwrap(), "capture-2");
        assert_eq!(backend.creates(), 2);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = MemoryBackend::new();
        backend.fail_on(phase::LOCK_CAPTURE);

        let err = backend.lock_capture("capture-1").await.unwrap_err();
        assert!(err.is_network());
        assert!(backend.calls().is_empty());

        backend.recover();
        backend.lock_capture("capture-1").await.unwrap();
        assert_eq!(backend.calls(), vec![BackendCall::LockCapture { capture_id: "capture-1".into() }]);
    }
}
