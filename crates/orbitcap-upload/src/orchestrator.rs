//! Upload orchestrator
//!
//! One [`UploadJob`] pushes one capture folder through the phases below,
//! publishing an [`UploadProgress`] on a watch channel at every step:
//!
//! 1. load every image and depth map (concurrently) plus the manifest
//! 2. create the remote capture record, or read its id back when resuming
//! 3. name the record and attach the camera resolution
//! 4. upload the images one at a time in index order
//! 5. optionally lock the record and queue a reconstruction task
//! 6. write `captureTask.txt` and `uploadInfo.txt`
//!
//! Images are sent strictly one after another: index `i + 1` is not sent
//! until the backend acknowledged index `i`. This trades throughput for a
//! backend that always sees frames in manifest order.
//!
//! There is no retry. Calling [`UploadJob::upload`] again resumes against
//! the record created earlier: a folder holding `captureId.txt` is always
//! resumed, so a remote record is created at most once per folder.

use futures::future::join_all;
use orbitcap_core::error::{CaptureError, Result};
use orbitcap_core::models::capture::{depth_file_name, image_file_name};
use orbitcap_core::models::{CameraMetadata, CaptureItem, TaskType, UploadReceipt};
use orbitcap_store::{sentinel, CaptureFolder};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

use crate::ports::{phase, CaptureBackend, ImageUpload};

/// Phase the orchestrator is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Loading,
    DoneLoad,
    CallingCreateCapture,
    DoneCreateCapture,
    CallingUpdateCapture,
    DoneUpdateCapture,
    CallingUploadImage,
    DoneUploadImage,
    CallingLockCapture,
    DoneLockCapture,
    CallingCreateTask,
    DoneCreateTask,
    Failed,
}

impl UploadState {
    /// Whether a remote call is outstanding
    pub fn is_calling(&self) -> bool {
        matches!(
            self,
            UploadState::CallingCreateCapture
                | UploadState::CallingUpdateCapture
                | UploadState::CallingUploadImage
                | UploadState::CallingLockCapture
                | UploadState::CallingCreateTask
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, UploadState::Failed)
    }
}

/// Observable progress of an upload job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct UploadProgress {
    pub state: UploadState,

    /// Images acknowledged by the backend
    pub uploaded: usize,

    /// Images that will be uploaded
    pub total: usize,

    /// Remote capture id once known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// The job reached a terminal state
    pub finished: bool,
}

impl UploadProgress {
    pub fn is_success(&self) -> bool {
        self.finished && !self.state.is_failed()
    }
}

/// What to upload the folder as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Name given to the remote record
    pub name: String,

    pub task: TaskType,

    /// Resume against the record whose id is stored in `captureId.txt`.
    ///
    /// Requires the file. Without this flag the job still resumes when the
    /// file is present.
    pub reupload: bool,
}

impl UploadRequest {
    pub fn new(name: impl Into<String>, task: TaskType) -> Self {
        Self { name: name.into(), task, reupload: false }
    }

    pub fn resume(mut self) -> Self {
        self.reupload = true;
        self
    }
}

/// Upload of one capture folder
pub struct UploadJob {
    dir: PathBuf,
    items: Vec<CaptureItem>,
    backend: Arc<dyn CaptureBackend>,
    progress: watch::Sender<UploadProgress>,
}

impl UploadJob {
    pub fn new(folder: &CaptureFolder, backend: Arc<dyn CaptureBackend>) -> Self {
        let (progress, _) = watch::channel(UploadProgress::default());
        Self {
            dir: folder.dir().to_path_buf(),
            items: folder.items().to_vec(),
            backend,
            progress,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Subscribe to progress updates
    pub fn progress(&self) -> watch::Receiver<UploadProgress> {
        self.progress.subscribe()
    }

    /// Latest progress
    pub fn current(&self) -> UploadProgress {
        self.progress.borrow().clone()
    }

    /// Run the whole upload.
    ///
    /// Any error leaves the job in [`UploadState::Failed`] and is returned to
    /// the caller.
    pub async fn upload(&self, request: &UploadRequest) -> Result<UploadReceipt> {
        self.progress.send_replace(UploadProgress::default());
        tracing::info!(
            folder = %self.dir.display(),
            name = %request.name,
            task = %request.task,
            reupload = request.reupload,
            "Starting upload"
        );

        match self.run(request).await {
            Ok(receipt) => {
                self.progress.send_modify(|p| p.finished = true);
                tracing::info!(capture_id = %receipt.capture_id, "Upload finished");
                Ok(receipt)
            }
            Err(e) => {
                tracing::error!(folder = %self.dir.display(), error = %e, "Upload failed");
                self.progress.send_modify(|p| {
                    p.state = UploadState::Failed;
                    p.error = Some(e.to_string());
                    p.finished = true;
                });
                Err(e)
            }
        }
    }

    async fn run(&self, request: &UploadRequest) -> Result<UploadReceipt> {
        self.enter(UploadState::Loading);
        let images = self.load_images().await?;
        let manifest = sentinel::load_manifest(&self.dir).await?;
        let camera = CameraMetadata { width: manifest.width, height: manifest.height };
        self.progress.send_modify(|p| {
            p.state = UploadState::DoneLoad;
            p.total = images.len();
        });

        let resume = request.reupload || sentinel::has_capture_id(&self.dir).await;
        let capture_id = if resume {
            let capture_id = sentinel::read_capture_id(&self.dir).await?;
            tracing::info!(%capture_id, "Resuming upload");
            capture_id
        } else {
            self.enter(UploadState::CallingCreateCapture);
            let capture_id = self.backend.create_capture().await?;
            sentinel::write_capture_id(&self.dir, &capture_id).await?;
            self.enter(UploadState::DoneCreateCapture);
            capture_id
        };
        self.progress.send_modify(|p| p.capture_id = Some(capture_id.clone()));

        self.enter(UploadState::CallingUpdateCapture);
        self.backend.update_capture(&capture_id, &request.name, camera).await?;
        self.enter(UploadState::DoneUpdateCapture);

        self.upload_images(&capture_id, &images).await?;

        if request.task.generates_reconstruction() {
            self.enter(UploadState::CallingLockCapture);
            self.backend.lock_capture(&capture_id).await?;
            self.enter(UploadState::DoneLockCapture);

            self.enter(UploadState::CallingCreateTask);
            self.backend.create_task(&capture_id, request.task).await?;
            self.enter(UploadState::DoneCreateTask);
        } else {
            tracing::debug!("No reconstruction requested, skipping lock and task");
        }

        let receipt = UploadReceipt::new(capture_id, request.name.clone(), request.task);
        sentinel::write_capture_task(&self.dir, request.task).await?;
        sentinel::write_receipt(&self.dir, &receipt).await?;
        Ok(receipt)
    }

    /// Read every item concurrently, keeping the ones with a readable image
    async fn load_images(&self) -> Result<Vec<ImageUpload>> {
        let loaded = join_all(self.items.iter().map(load_item)).await;

        let mut loaded: Vec<_> = loaded.into_iter().flatten().collect();
        loaded.sort_by_key(|(id, _, _)| *id);
        if loaded.is_empty() {
            return Err(CaptureError::InvalidCaptureDirectory { path: self.dir.clone() });
        }

        Ok(loaded
            .into_iter()
            .enumerate()
            .map(|(index, (id, image, depth))| ImageUpload {
                index,
                id,
                image,
                depth,
                file_name: image_file_name(id),
                depth_file_name: depth_file_name(id),
            })
            .collect())
    }

    async fn upload_images(&self, capture_id: &str, images: &[ImageUpload]) -> Result<()> {
        self.enter(UploadState::CallingUploadImage);

        for image in images {
            let ack = self.backend.upload_image(capture_id, image).await?;
            if ack.index != image.index {
                return Err(CaptureError::Backend {
                    phase: phase::UPLOAD_IMAGE.to_string(),
                    status: 200,
                    body: format!("acknowledged image {} while sending {}", ack.index, image.index),
                });
            }
            self.progress.send_modify(|p| p.uploaded += 1);
            tracing::debug!(index = image.index, id = image.id, "Image acknowledged");
        }

        let uploaded = self.progress.borrow().uploaded;
        if uploaded != images.len() {
            return Err(CaptureError::Backend {
                phase: phase::UPLOAD_IMAGE.to_string(),
                status: 200,
                body: format!("{} of {} images acknowledged", uploaded, images.len()),
            });
        }

        self.enter(UploadState::DoneUploadImage);
        Ok(())
    }

    fn enter(&self, state: UploadState) {
        tracing::debug!(?state, "Upload phase");
        self.progress.send_modify(|p| p.state = state);
    }
}

/// Read one item's bytes; a missing image drops the item, a missing depth
/// map only drops the depth
async fn load_item(item: &CaptureItem) -> Option<(u32, Vec<u8>, Option<Vec<u8>>)> {
    let image = match tokio::fs::read(&item.image_path).await {
        Ok(image) => image,
        Err(e) => {
            tracing::warn!(path = %item.image_path.display(), error = %e, "Skipping unreadable image");
            return None;
        }
    };

    let depth = match &item.depth_path {
        Some(path) => match tokio::fs::read(path).await {
            Ok(depth) => Some(depth),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Uploading without depth map");
                None
            }
        },
        None => None,
    };

    Some((item.id, image, depth))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calling_states() {
        assert!(UploadState::CallingUploadImage.is_calling());
        assert!(!UploadState::DoneUploadImage.is_calling());
        assert!(UploadState::Failed.is_failed());
    }

    #[test]
    fn test_progress_success_requires_finish() {
        let mut progress = UploadProgress { state: UploadState::DoneUploadImage, ..Default::default() };
        assert!(!progress.is_success());

        progress.finished = true;
        assert!(progress.is_success());

        progress.state = UploadState::Failed;
        assert!(!progress.is_success());
    }

    #[test]
    fn test_request_resume() {
        let request = UploadRequest::new("mug", TaskType::Colmap);
        assert!(!request.reupload);
        assert!(request.resume().reupload);
    }
}
