//! Reconstruction manifest (`metadata.json` / `transforms.json`)
//!
//! The key names follow the layout expected by NeRF-style reconstruction
//! tools: `w`, `h`, `fl_x`, `fl_y`, `cx`, `cy` at the root, a per-frame copy
//! of the same intrinsics, and a row-major 4x4 camera-to-world matrix.

use serde::{Deserialize, Serialize};

use super::frame::{CameraIntrinsics, CapturedFrame};
use super::geometry::rows_from_transform;

/// Per-frame manifest entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Color image path relative to the capture folder
    pub file_path: String,

    /// Depth image path relative to the capture folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_path: Option<String>,

    /// Camera-to-world pose as four rows of four floats
    pub transform_matrix: [[f32; 4]; 4],

    /// Capture timestamp in seconds
    pub timestamp: f64,

    #[serde(rename = "fl_x")]
    pub focal_length_x: f32,

    #[serde(rename = "fl_y")]
    pub focal_length_y: f32,

    #[serde(rename = "cx")]
    pub principal_point_x: f32,

    #[serde(rename = "cy")]
    pub principal_point_y: f32,

    #[serde(rename = "w")]
    pub width: u32,

    #[serde(rename = "h")]
    pub height: u32,
}

impl FrameRecord {
    /// Build a record for a captured frame stored under the given file names
    pub fn from_frame(
        frame: &CapturedFrame,
        file_path: impl Into<String>,
        depth_path: Option<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            depth_path,
            transform_matrix: rows_from_transform(&frame.transform),
            timestamp: frame.timestamp,
            focal_length_x: frame.intrinsics.focal_length_x,
            focal_length_y: frame.intrinsics.focal_length_y,
            principal_point_x: frame.intrinsics.principal_point_x,
            principal_point_y: frame.intrinsics.principal_point_y,
            width: frame.width,
            height: frame.height,
        }
    }

    pub fn intrinsics(&self) -> CameraIntrinsics {
        CameraIntrinsics {
            focal_length_x: self.focal_length_x,
            focal_length_y: self.focal_length_y,
            principal_point_x: self.principal_point_x,
            principal_point_y: self.principal_point_y,
        }
    }
}

/// Session-wide manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "w")]
    pub width: u32,

    #[serde(rename = "h")]
    pub height: u32,

    #[serde(rename = "fl_x")]
    pub focal_length_x: f32,

    #[serde(rename = "fl_y")]
    pub focal_length_y: f32,

    #[serde(rename = "cx")]
    pub principal_point_x: f32,

    #[serde(rename = "cy")]
    pub principal_point_y: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_integer_scale: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_source: Option<String>,

    /// Frames in capture order
    #[serde(default)]
    pub frames: Vec<FrameRecord>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            focal_length_x: 0.0,
            focal_length_y: 0.0,
            principal_point_x: 0.0,
            principal_point_y: 0.0,
            depth_integer_scale: None,
            depth_source: None,
            frames: Vec::new(),
        }
    }
}

impl Manifest {
    /// Fresh manifest for a new capture session.
    ///
    /// Width and height start at zero; the first frame overwrites them along
    /// with the placeholder intrinsics.
    pub fn for_new_session() -> Self {
        Self {
            focal_length_x: 1.0,
            focal_length_y: 1.0,
            principal_point_x: 320.0,
            principal_point_y: 240.0,
            depth_integer_scale: Some(1.0),
            ..Self::default()
        }
    }

    /// Whether the image geometry has been taken from a frame yet
    pub fn has_geometry(&self) -> bool {
        self.width != 0
    }

    /// Append a frame, adopting its geometry if it is the first one
    pub fn push_frame(&mut self, record: FrameRecord) {
        if !self.has_geometry() {
            self.width = record.width;
            self.height = record.height;
            self.focal_length_x = record.focal_length_x;
            self.focal_length_y = record.focal_length_y;
            self.principal_point_x = record.principal_point_x;
            self.principal_point_y = record.principal_point_y;
        }
        self.frames.push(record);
    }

    /// Serialize with unescaped path separators
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
