//! OrbitCap Track - Checkpoint geometry and proximity tracking
//!
//! Builds the ring (or two-ring dome) of checkpoints around an anchor and
//! resolves each live camera position to the checkpoint being aimed at.
//! Pure computation, no I/O.

pub mod field;
pub mod tracker;

pub use field::{CheckpointField, FieldSpec, RingLayout, RingSpec};
pub use tracker::{ProximityTracker, TrackerConfig};
