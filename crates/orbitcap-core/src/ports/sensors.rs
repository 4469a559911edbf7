use async_trait::async_trait;

use crate::error::Result;
use crate::models::CapturedFrame;

/// Outcome of asking the camera for a full-resolution frame
#[derive(Debug, Clone)]
pub enum FrameGrab {
    Frame(Box<CapturedFrame>),
    /// The platform dropped the request, e.g. because the AR session paused
    Cancelled,
}

/// Port for grabbing full-resolution frames from the platform camera
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Capture one frame at the current camera pose
    async fn grab_frame(&self) -> Result<FrameGrab>;
}

/// Port for the device motion estimate used to avoid blurred captures
pub trait MotionSensor: Send + Sync {
    /// Current acceleration magnitude with gravity removed, in g.
    ///
    /// Returns `None` when no reading is available.
    fn acceleration(&self) -> Option<f64>;
}

/// Motion sensor reporting a constant reading
#[derive(Debug, Clone, Copy)]
pub struct FixedMotion(pub Option<f64>);

impl FixedMotion {
    /// A device that is held perfectly still
    pub fn still() -> Self {
        Self(Some(0.0))
    }
}

impl MotionSensor for FixedMotion {
    fn acceleration(&self) -> Option<f64> {
        self.0
    }
}
