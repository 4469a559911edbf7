//! OrbitCap Core - Domain models, configuration, and collaborator ports
//!
//! This crate contains the shared capture domain (checkpoints, manifests,
//! capture folders, upload receipts) and the port traits that the platform
//! camera, motion sensor, and UI adapters implement.

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use error::{CaptureError, Result};
