//! Port for the remote reconstruction backend

use async_trait::async_trait;
use orbitcap_core::error::Result;
use orbitcap_core::models::{CameraMetadata, TaskType};

/// Phase names carried by backend errors
pub mod phase {
    pub const CREATE_CAPTURE: &str = "create capture";
    pub const UPDATE_CAPTURE: &str = "update capture";
    pub const UPLOAD_IMAGE: &str = "upload image";
    pub const LOCK_CAPTURE: &str = "lock capture";
    pub const CREATE_TASK: &str = "create task";
}

/// One image (and optional depth map) ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Position in the id-ordered upload sequence
    pub index: usize,

    /// Capture item id the bytes were read from
    pub id: u32,

    pub image: Vec<u8>,

    /// Empty when the item has no readable depth map
    pub depth: Option<Vec<u8>>,

    pub file_name: String,

    pub depth_file_name: String,
}

/// Backend acknowledgment of one uploaded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAck {
    pub index: usize,

    /// Remote image id, when the backend reports one
    pub image_id: Option<String>,
}

/// Remote capture API
///
/// Every call maps to one request. Implementations report transport failures
/// as `CaptureError::Network` and non-success responses as
/// `CaptureError::Backend`, both tagged with the phase that failed.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Create an empty remote capture record and return its id
    async fn create_capture(&self) -> Result<String>;

    /// Name the record and attach the camera resolution
    async fn update_capture(&self, capture_id: &str, name: &str, camera: CameraMetadata) -> Result<()>;

    /// Send one image with its explicit index
    async fn upload_image(&self, capture_id: &str, image: &ImageUpload) -> Result<UploadAck>;

    /// Freeze the record so no more images are accepted
    async fn lock_capture(&self, capture_id: &str) -> Result<()>;

    /// Queue a reconstruction task for the record
    async fn create_task(&self, capture_id: &str, task: TaskType) -> Result<()>;
}
