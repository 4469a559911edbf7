//! OrbitCap Upload - Pushing capture folders to the reconstruction backend
//!
//! The [`orchestrator`] drives one folder through load, remote record
//! creation, ordered image upload and the optional reconstruction task.
//! Backends plug in through the [`ports::CaptureBackend`] port: [`http`]
//! talks to the real service, [`memory`] records calls for development and
//! tests.

pub mod http;
pub mod memory;
pub mod orchestrator;
pub mod ports;

pub use http::HttpBackend;
pub use memory::{BackendCall, MemoryBackend};
pub use orchestrator::{UploadJob, UploadProgress, UploadRequest, UploadState};
pub use ports::{phase, CaptureBackend, ImageUpload, UploadAck};
