//! OrbitCap Store - Capture folder persistence
//!
//! This crate owns everything that touches a capture folder on disk: the
//! dataset writer producing images and the reconstruction manifest, the
//! folder index used to browse past captures, and the small sentinel files
//! that record upload state.

pub mod folder;
pub mod sentinel;
pub mod writer;

pub use folder::{list_folders, remove_folder, CaptureFolder};
pub use writer::{DatasetWriter, WriterOptions};
