//! Small state files kept next to the captured images
//!
//! - `captureId.txt`: remote capture id, written by a fresh upload and read
//!   back when resuming
//! - `captureTask.txt`: reconstruction task requested at upload time
//! - `uploadInfo.txt`: JSON receipt of the last finished upload
//! - `metadata.json`: reconstruction manifest written by the dataset writer

use orbitcap_core::error::{CaptureError, Result};
use orbitcap_core::models::{Manifest, TaskType, UploadReceipt};
use std::io::ErrorKind;
use std::path::Path;
use tokio::io::AsyncWriteExt;

pub const CAPTURE_ID_FILE: &str = "captureId.txt";
pub const CAPTURE_TASK_FILE: &str = "captureTask.txt";
pub const UPLOAD_INFO_FILE: &str = "uploadInfo.txt";
pub const MANIFEST_FILE: &str = "metadata.json";

/// Whether the folder already has a remote capture record
pub async fn has_capture_id(dir: &Path) -> bool {
    tokio::fs::try_exists(dir.join(CAPTURE_ID_FILE)).await.unwrap_or(false)
}

/// Read the persisted remote capture id.
///
/// A missing file is `FileNotFound`: resuming without it would silently
/// create a duplicate remote record.
pub async fn read_capture_id(dir: &Path) -> Result<String> {
    let path = dir.join(CAPTURE_ID_FILE);
    match tokio::fs::read_to_string(&path).await {
        Ok(id) => {
            let id = id.trim();
            if id.is_empty() {
                return Err(CaptureError::FileNotFound { path });
            }
            Ok(id.to_string())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Err(CaptureError::FileNotFound { path }),
        Err(e) => Err(e.into()),
    }
}

/// Persist the remote capture id returned by a fresh create.
///
/// The id is written once per folder. An existing file is left untouched and
/// reported as `CaptureIdExists`.
pub async fn write_capture_id(dir: &Path, capture_id: &str) -> Result<()> {
    let path = dir.join(CAPTURE_ID_FILE);
    let mut file = match tokio::fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(CaptureError::CaptureIdExists { path });
        }
        Err(e) => return Err(e.into()),
    };
    file.write_all(capture_id.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Task type recorded for the folder, or the empty string if none was
pub async fn read_capture_task(dir: &Path) -> String {
    tokio::fs::read_to_string(dir.join(CAPTURE_TASK_FILE)).await.unwrap_or_default()
}

pub async fn write_capture_task(dir: &Path, task: TaskType) -> Result<()> {
    tokio::fs::write(dir.join(CAPTURE_TASK_FILE), task.as_str()).await?;
    Ok(())
}

/// Upload receipt for the folder.
///
/// Missing or unreadable receipts fall back to the "Not Uploaded Yet"
/// placeholder.
pub async fn read_receipt(dir: &Path) -> UploadReceipt {
    let path = dir.join(UPLOAD_INFO_FILE);
    let Ok(json) = tokio::fs::read_to_string(&path).await else {
        return UploadReceipt::not_uploaded();
    };

    match serde_json::from_str(&json) {
        Ok(receipt) => receipt,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable upload receipt");
            UploadReceipt::not_uploaded()
        }
    }
}

pub async fn write_receipt(dir: &Path, receipt: &UploadReceipt) -> Result<()> {
    let json = serde_json::to_string(receipt)?;
    tokio::fs::write(dir.join(UPLOAD_INFO_FILE), json).await?;
    Ok(())
}

/// Load the folder's reconstruction manifest
pub async fn load_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    let json = match tokio::fs::read_to_string(&path).await {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(CaptureError::FileNotFound { path });
        }
        Err(e) => return Err(e.into()),
    };
    Manifest::from_json(&json)
}
