//! Stand-in collaborators for `orbitcap simulate`

use async_trait::async_trait;
use nalgebra::Matrix4;
use orbitcap_core::error::Result;
use orbitcap_core::models::{
    CameraIntrinsics, CameraPose, CapturedFrame, Checkpoint, MarkerColor, SessionState, Vec3,
};
use orbitcap_core::ports::{FrameGrab, FrameSource, SessionObserver};
use orbitcap_track::CheckpointField;
use std::sync::Mutex;
use std::time::Instant;

/// Distance from the anchor at which the scripted camera orbits
pub const ORBIT_DISTANCE: f32 = 0.3;

/// Camera returning the same image from wherever it currently is
pub struct StillCamera {
    image: Vec<u8>,
    depth: Option<Vec<u8>>,
    width: u32,
    height: u32,
    position: Mutex<Vec3>,
    started: Instant,
}

impl StillCamera {
    pub fn new(image: Vec<u8>, depth: Option<Vec<u8>>, width: u32, height: u32) -> Self {
        Self {
            image,
            depth,
            width,
            height,
            position: Mutex::new(Vec3::zeros()),
            started: Instant::now(),
        }
    }

    /// Move the camera and return the pose to report for it
    pub fn move_to(&self, position: Vec3) -> CameraPose {
        if let Ok(mut current) = self.position.lock() {
            *current = position;
        }
        CameraPose::new(position, self.elapsed())
    }

    fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

#[async_trait]
impl FrameSource for StillCamera {
    async fn grab_frame(&self) -> Result<FrameGrab> {
        let position = self.position.lock().map(|p| *p).unwrap_or_else(|e| *e.into_inner());

        let mut transform = Matrix4::identity();
        transform[(0, 3)] = position.x;
        transform[(1, 3)] = position.y;
        transform[(2, 3)] = position.z;

        let focal = self.width as f32 * 0.8;
        Ok(FrameGrab::Frame(Box::new(CapturedFrame {
            image: self.image.clone(),
            depth: self.depth.clone(),
            intrinsics: CameraIntrinsics {
                focal_length_x: focal,
                focal_length_y: focal,
                principal_point_x: self.width as f32 / 2.0,
                principal_point_y: self.height as f32 / 2.0,
            },
            width: self.width,
            height: self.height,
            transform,
            timestamp: self.elapsed(),
        })))
    }
}

/// Observer that reports session events through tracing
pub struct LogObserver;

impl SessionObserver for LogObserver {
    fn state_changed(&self, from: SessionState, to: SessionState) {
        tracing::info!(%from, %to, "Session state changed");
    }

    fn checkpoints_updated(&self, colors: &[MarkerColor]) {
        let captured = colors.iter().filter(|c| **c == MarkerColor::Done).count();
        tracing::trace!(captured, total = colors.len(), "Checkpoints updated");
    }

    fn track_created(&self, checkpoints: &[Checkpoint]) -> Result<()> {
        tracing::info!(checkpoints = checkpoints.len(), "Checkpoint track created");
        Ok(())
    }

    fn failed(&self, reason: &str) {
        tracing::error!(reason, "Session failed");
    }
}

/// Camera positions facing each checkpoint of `field`, in index order.
///
/// Each position lies on the ray from the anchor through the checkpoint, so
/// it shares the checkpoint's azimuth and elevation.
pub fn orbit_positions(field: &CheckpointField) -> Vec<Vec3> {
    let anchor = field.anchor();
    field
        .checkpoints()
        .iter()
        .map(|checkpoint| {
            let direction = checkpoint.position - anchor;
            let norm = direction.norm();
            if norm <= f32::EPSILON {
                anchor
            } else {
                anchor + direction * (ORBIT_DISTANCE / norm)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbitcap_track::{FieldSpec, ProximityTracker, TrackerConfig};

    #[test]
    fn test_orbit_faces_every_checkpoint() {
        let tracker = ProximityTracker::new(TrackerConfig::default());
        for spec in [FieldSpec::single_ring(20, 0.15), FieldSpec::dome(12, 0.15)] {
            let field = CheckpointField::build(Vec3::new(1.0, 0.5, -2.0), spec).unwrap();
            for (index, position) in orbit_positions(&field).into_iter().enumerate() {
                assert_eq!(tracker.find_nearest(&field, position), Some(index));
            }
        }
    }

    #[tokio::test]
    async fn test_still_camera_follows_moves() {
        let camera = StillCamera::new(vec![1, 2, 3], None, 640, 480);
        let pose = camera.move_to(Vec3::new(0.3, 0.0, 0.0));
        assert_eq!(pose.position.x, 0.3);

        let FrameGrab::Frame(frame) = camera.grab_frame().await.unwrap() else {
            panic!("expected a frame");
        };
        assert_eq!(frame.pose().position, Vec3::new(0.3, 0.0, 0.0));
        assert_eq!(frame.intrinsics.principal_point_x, 320.0);
        assert_eq!(frame.image, vec![1, 2, 3]);
    }
}
