//! OrbitCap Session - Capture session state machine
//!
//! The session is split in three layers:
//! - [`state`]: a pure planner mapping a state change to the effects it needs
//! - [`session`]: the session object owning the checkpoint field, the
//!   tracker and the dataset writer, applying the effects it can perform
//!   synchronously
//! - [`driver`]: a single-writer actor task that owns the session, runs the
//!   timers and publishes snapshots

pub mod driver;
pub mod session;
pub mod state;

pub use driver::{spawn_session, SessionHandle};
pub use session::{
    CaptureSession, FrameCaptureResult, RejectReason, SessionConfig, SessionSnapshot,
};
pub use state::{plan_transition, Effect, TransitionContext};
