use crate::error::Result;
use crate::models::{Checkpoint, MarkerColor, SessionState};

/// Port for the UI layer rendering session progress.
///
/// Every method has a no-op default so adapters only implement what they
/// draw. Calls arrive on the session's update path and must not block.
pub trait SessionObserver: Send + Sync {
    /// The session entered a new state
    fn state_changed(&self, _from: SessionState, _to: SessionState) {}

    /// Marker colours after a tracked pose, indexed by checkpoint index
    fn checkpoints_updated(&self, _colors: &[MarkerColor]) {}

    /// A checkpoint track was built around the anchor.
    ///
    /// Errors here come from decorative assets and never block the capture.
    fn track_created(&self, _checkpoints: &[Checkpoint]) -> Result<()> {
        Ok(())
    }

    /// Checkpoint track and anchored visuals were removed
    fn track_removed(&self) {}

    /// The session failed and needs a distinct error screen
    fn failed(&self, _reason: &str) {}
}

/// Observer that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SessionObserver for NullObserver {}
