use serde::{Deserialize, Serialize};

use super::geometry::{Transform, Vec3};

/// Pinhole intrinsics in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub focal_length_x: f32,
    pub focal_length_y: f32,
    pub principal_point_x: f32,
    pub principal_point_y: f32,
}

/// Live pose sample delivered by the AR tracker every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    /// Camera position in world space
    pub position: Vec3,

    /// Sensor timestamp in seconds
    pub timestamp: f64,
}

impl CameraPose {
    pub fn new(position: Vec3, timestamp: f64) -> Self {
        Self { position, timestamp }
    }

    /// Extract the camera position from a camera-to-world transform
    pub fn from_transform(transform: &Transform, timestamp: f64) -> Self {
        Self {
            position: Vec3::new(transform[(0, 3)], transform[(1, 3)], transform[(2, 3)]),
            timestamp,
        }
    }
}

/// Full-resolution frame handed over by the camera collaborator
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Encoded color image
    pub image: Vec<u8>,

    /// Encoded depth map, when the device produces one
    pub depth: Option<Vec<u8>>,

    pub intrinsics: CameraIntrinsics,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Camera-to-world pose at exposure time
    pub transform: Transform,

    /// Sensor timestamp in seconds
    pub timestamp: f64,
}

impl CapturedFrame {
    pub fn pose(&self) -> CameraPose {
        CameraPose::from_transform(&self.transform, self.timestamp)
    }
}
