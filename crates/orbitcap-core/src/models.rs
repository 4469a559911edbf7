pub mod capture;
pub mod checkpoint;
pub mod frame;
pub mod geometry;
pub mod manifest;
pub mod session;
pub mod upload;

pub use capture::{CaptureItem, DEPTH_SUFFIX, IMAGE_PREFIX, IMAGE_SUFFIX};
pub use checkpoint::{Checkpoint, MarkerColor, PointStatus, Ring};
pub use frame::{CameraIntrinsics, CameraPose, CapturedFrame};
pub use geometry::{rows_from_transform, transform_from_rows, Transform, Vec3};
pub use manifest::{FrameRecord, Manifest};
pub use session::{CaptureMode, SessionState};
pub use upload::{CameraMetadata, TaskType, UploadReceipt};
