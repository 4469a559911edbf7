//! Integration tests for the upload orchestrator
//!
//! Capture folders are produced by the dataset writer in a temporary
//! directory and uploaded to the recording in-memory backend.

use async_trait::async_trait;
use nalgebra::Matrix4;
use orbitcap_core::error::{CaptureError, Result};
use orbitcap_core::models::capture::depth_file_name;
use orbitcap_core::models::{CameraIntrinsics, CameraMetadata, CapturedFrame, TaskType};
use orbitcap_store::sentinel::{self, CAPTURE_ID_FILE, MANIFEST_FILE};
use orbitcap_store::{CaptureFolder, DatasetWriter, WriterOptions};
use orbitcap_upload::{
    phase, BackendCall, CaptureBackend, ImageUpload, MemoryBackend, UploadAck, UploadJob, UploadRequest, UploadState,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn frame(x: f32) -> CapturedFrame {
    let mut transform = Matrix4::identity();
    transform[(0, 3)] = x;
    CapturedFrame {
        image: format!("png-{}", x).into_bytes(),
        depth: Some(vec![1, 2, 3]),
        intrinsics: CameraIntrinsics {
            focal_length_x: 1000.0,
            focal_length_y: 1000.0,
            principal_point_x: 960.0,
            principal_point_y: 720.0,
        },
        width: 1920,
        height: 1440,
        transform,
        timestamp: x as f64,
    }
}

/// Write a finalized capture folder holding `frames` images
async fn capture_folder(root: &TempDir, frames: usize) -> PathBuf {
    let mut writer = DatasetWriter::new(WriterOptions::new(root.path()));
    let dir = writer.initialize_session_named("mug").await.unwrap();
    for i in 0..frames {
        writer.write_frame(frame(i as f32)).unwrap();
    }
    writer.finalize().await.unwrap();
    dir
}

#[tokio::test]
async fn test_fresh_upload_runs_every_phase() {
    let root = TempDir::new().unwrap();
    let dir = capture_folder(&root, 3).await;
    let backend = MemoryBackend::new();

    let folder = CaptureFolder::load(&dir).await;
    let job = UploadJob::new(&folder, Arc::new(backend.clone()));
    let receipt = job.upload(&UploadRequest::new("mug", TaskType::Colmap)).await.unwrap();

    assert_eq!(receipt.capture_id, "capture-1");
    assert_eq!(receipt.task, "COLMAP");

    let calls = backend.calls();
    assert_eq!(calls.first(), Some(&BackendCall::CreateCapture { capture_id: "capture-1".into() }));
    assert_eq!(
        calls[1],
        BackendCall::UpdateCapture {
            capture_id: "capture-1".into(),
            name: "mug".into(),
            camera: CameraMetadata { width: 1920, height: 1440 },
        }
    );
    assert_eq!(backend.uploaded_indices(), vec![0, 1, 2]);
    assert_eq!(
        &calls[5..],
        &[
            BackendCall::LockCapture { capture_id: "capture-1".into() },
            BackendCall::CreateTask { capture_id: "capture-1".into(), task: TaskType::Colmap },
        ]
    );

    let progress = job.current();
    assert_eq!(progress.state, UploadState::DoneCreateTask);
    assert_eq!((progress.uploaded, progress.total), (3, 3));
    assert!(progress.is_success());

    assert_eq!(sentinel::read_capture_id(&dir).await.unwrap(), "capture-1");
    assert_eq!(sentinel::read_capture_task(&dir).await, "COLMAP");
    assert_eq!(sentinel::read_receipt(&dir).await, receipt);
}

#[tokio::test]
async fn test_images_are_sent_one_at_a_time() {
    let root = TempDir::new().unwrap();
    let dir = capture_folder(&root, 5).await;
    let backend = MemoryBackend::new().with_upload_delay(Duration::from_millis(5));

    let folder = CaptureFolder::load(&dir).await;
    let job = UploadJob::new(&folder, Arc::new(backend.clone()));
    job.upload(&UploadRequest::new("mug", TaskType::None)).await.unwrap();

    assert_eq!(backend.uploaded_indices(), vec![0, 1, 2, 3, 4]);
    assert_eq!(backend.max_in_flight(), 1);
}

#[tokio::test]
async fn test_no_task_skips_lock_and_task() {
    let root = TempDir::new().unwrap();
    let dir = capture_folder(&root, 2).await;
    let backend = MemoryBackend::new();

    let folder = CaptureFolder::load(&dir).await;
    let job = UploadJob::new(&folder, Arc::new(backend.clone()));
    let receipt = job.upload(&UploadRequest::new("mug", TaskType::None)).await.unwrap();

    assert_eq!(receipt.task, "None");
    assert_eq!(job.current().state, UploadState::DoneUploadImage);
    assert!(job.current().is_success());
    assert!(!backend
        .calls()
        .iter()
        .any(|c| matches!(c, BackendCall::LockCapture { .. } | BackendCall::CreateTask { .. })));
}

#[tokio::test]
async fn test_resume_never_creates_twice() {
    let root = TempDir::new().unwrap();
    let dir = capture_folder(&root, 2).await;
    let backend = MemoryBackend::new();
    let folder = CaptureFolder::load(&dir).await;
    let job = UploadJob::new(&folder, Arc::new(backend.clone()));

    job.upload(&UploadRequest::new("mug", TaskType::None)).await.unwrap();
    assert!(folder.is_reupload().await);

    let resume = UploadRequest::new("mug", TaskType::GaussianSplatting).resume();
    job.upload(&resume).await.unwrap();
    let receipt = job.upload(&resume).await.unwrap();

    assert_eq!(backend.creates(), 1);
    assert_eq!(receipt.capture_id, "capture-1");
    assert_eq!(backend.uploaded_indices(), vec![0, 1, 0, 1, 0, 1]);
    assert_eq!(sentinel::read_capture_task(&dir).await, "GS");
}

#[tokio::test]
async fn test_second_upload_reuses_remote_capture() {
    let root = TempDir::new().unwrap();
    let dir = capture_folder(&root, 2).await;
    let backend = MemoryBackend::new();
    let folder = CaptureFolder::load(&dir).await;
    let job = UploadJob::new(&folder, Arc::new(backend.clone()));

    job.upload(&UploadRequest::new("mug", TaskType::None)).await.unwrap();
    let receipt = job.upload(&UploadRequest::new("mug v2", TaskType::None)).await.unwrap();

    assert_eq!(backend.creates(), 1);
    assert_eq!(receipt.capture_id, "capture-1");
    assert_eq!(sentinel::read_capture_id(&dir).await.unwrap(), "capture-1");
    assert!(backend.calls().contains(&BackendCall::UpdateCapture {
        capture_id: "capture-1".into(),
        name: "mug v2".into(),
        camera: CameraMetadata { width: 1920, height: 1440 },
    }));
    assert_eq!(backend.uploaded_indices(), vec![0, 1, 0, 1]);
}

#[tokio::test]
async fn test_resume_without_capture_id_fails() {
    let root = TempDir::new().unwrap();
    let dir = capture_folder(&root, 2).await;
    let backend = MemoryBackend::new();

    let folder = CaptureFolder::load(&dir).await;
    let job = UploadJob::new(&folder, Arc::new(backend.clone()));
    let err = job.upload(&UploadRequest::new("mug", TaskType::None).resume()).await.unwrap_err();

    assert!(matches!(err, CaptureError::FileNotFound { .. }));
    assert_eq!(backend.creates(), 0);
    let progress = job.current();
    assert_eq!(progress.state, UploadState::Failed);
    assert!(progress.finished && !progress.is_success());
}

/// Backend that stores each image under the next index
struct ShiftedAckBackend(MemoryBackend);

#[async_trait]
impl CaptureBackend for ShiftedAckBackend {
    async fn create_capture(&self) -> Result<String> {
        self.0.create_capture().await
    }

    async fn update_capture(&self, capture_id: &str, name: &str, camera: CameraMetadata) -> Result<()> {
        self.0.update_capture(capture_id, name, camera).await
    }

    async fn upload_image(&self, capture_id: &str, image: &ImageUpload) -> Result<UploadAck> {
        let ack = self.0.upload_image(capture_id, image).await?;
        Ok(UploadAck { index: ack.index + 1, ..ack })
    }

    async fn lock_capture(&self, capture_id: &str) -> Result<()> {
        self.0.lock_capture(capture_id).await
    }

    async fn create_task(&self, capture_id: &str, task: TaskType) -> Result<()> {
        self.0.create_task(capture_id, task).await
    }
}

#[tokio::test]
async fn test_mismatched_ack_stops_upload() {
    let root = TempDir::new().unwrap();
    let dir = capture_folder(&root, 2).await;
    let backend = MemoryBackend::new();
    let folder = CaptureFolder::load(&dir).await;
    let job = UploadJob::new(&folder, Arc::new(ShiftedAckBackend(backend.clone())));

    let err = job.upload(&UploadRequest::new("mug", TaskType::Colmap)).await.unwrap_err();
    match err {
        CaptureError::Backend { phase, body, .. } => {
            assert_eq!(phase, "upload image");
            assert_eq!(body, "acknowledged image 1 while sending 0");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(backend.uploaded_indices(), vec![0]);
    assert_eq!(job.current().uploaded, 0);
    assert!(!backend.calls().iter().any(|call| matches!(call, BackendCall::LockCapture { .. })));
}

#[tokio::test]
async fn test_network_failure_then_resume() {
    let root = TempDir::new().unwrap();
    let dir = capture_folder(&root, 3).await;
    let backend = MemoryBackend::new();
    let folder = CaptureFolder::load(&dir).await;
    let job = UploadJob::new(&folder, Arc::new(backend.clone()));

    backend.fail_on(phase::UPLOAD_IMAGE);
    let err = job.upload(&UploadRequest::new("mug", TaskType::Sugar)).await.unwrap_err();
    assert!(err.is_network());
    assert_eq!(job.current().state, UploadState::Failed);
    assert_eq!(job.current().uploaded, 0);
    assert!(tokio::fs::try_exists(dir.join(CAPTURE_ID_FILE)).await.unwrap());
    assert!(!sentinel::read_receipt(&dir).await.is_uploaded());

    backend.recover();
    let receipt = job.upload(&UploadRequest::new("mug", TaskType::Sugar).resume()).await.unwrap();
    assert_eq!(receipt.capture_id, "capture-1");
    assert_eq!(backend.creates(), 1);
    assert_eq!(job.current().uploaded, 3);
}

#[tokio::test]
async fn test_missing_depth_is_not_fatal() {
    let root = TempDir::new().unwrap();
    let dir = capture_folder(&root, 3).await;
    let folder = CaptureFolder::load(&dir).await;
    tokio::fs::remove_file(dir.join(depth_file_name(1))).await.unwrap();

    let backend = MemoryBackend::new();
    let job = UploadJob::new(&folder, Arc::new(backend.clone()));
    job.upload(&UploadRequest::new("mug", TaskType::None)).await.unwrap();

    let depths: Vec<bool> = backend
        .calls()
        .iter()
        .filter_map(|c| match c {
            BackendCall::UploadImage { has_depth, .. } => Some(*has_depth),
            _ => None,
        })
        .collect();
    assert_eq!(depths, vec![true, false, true]);
}

#[tokio::test]
async fn test_missing_manifest_is_fatal() {
    let root = TempDir::new().unwrap();
    let dir = capture_folder(&root, 2).await;
    tokio::fs::remove_file(dir.join(MANIFEST_FILE)).await.unwrap();

    let backend = MemoryBackend::new();
    let folder = CaptureFolder::load(&dir).await;
    let job = UploadJob::new(&folder, Arc::new(backend.clone()));
    let err = job.upload(&UploadRequest::new("mug", TaskType::None)).await.unwrap_err();

    assert!(matches!(err, CaptureError::FileNotFound { .. }));
    assert!(backend.calls().is_empty());
    assert_eq!(job.current().state, UploadState::Failed);
}

#[tokio::test]
async fn test_empty_folder_is_fatal() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("empty");
    tokio::fs::create_dir(&dir).await.unwrap();

    let folder = CaptureFolder::load(&dir).await;
    let job = UploadJob::new(&folder, Arc::new(MemoryBackend::new()));
    let err = job.upload(&UploadRequest::new("empty", TaskType::None)).await.unwrap_err();

    assert!(matches!(err, CaptureError::InvalidCaptureDirectory { .. }));
}

#[tokio::test]
async fn test_progress_is_observable() {
    let root = TempDir::new().unwrap();
    let dir = capture_folder(&root, 2).await;
    let folder = CaptureFolder::load(&dir).await;
    let job = UploadJob::new(&folder, Arc::new(MemoryBackend::new()));
    let mut progress = job.progress();

    job.upload(&UploadRequest::new("mug", TaskType::None)).await.unwrap();

    assert!(progress.has_changed().unwrap());
    let latest = progress.borrow_and_update().clone();
    assert_eq!(latest.capture_id.as_deref(), Some("capture-1"));
    assert!(latest.is_success());
}
