//! Port trait definitions
//!
//! These traits define the interfaces that platform adapters (camera, motion
//! sensor, renderer) must implement.

pub mod observer;
pub mod sensors;

pub use observer::{NullObserver, SessionObserver};
pub use sensors::{FixedMotion, FrameGrab, FrameSource, MotionSensor};
