//! Error types for OrbitCap

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    // Capture folder errors
    #[error("Capture project already exists at {path}")]
    ProjectAlreadyExists { path: PathBuf },

    #[error("Invalid capture directory: {path}")]
    InvalidCaptureDirectory { path: PathBuf },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Remote capture id already recorded at {path}")]
    CaptureIdExists { path: PathBuf },

    #[error("No capture session is active. Call initialize_session first")]
    SessionNotStarted,

    #[error("Capture session driver has stopped")]
    SessionClosed,

    // Checkpoint errors
    #[error("Checkpoint {index} out of range (field has {count} checkpoints)")]
    CheckpointOutOfRange { index: usize, count: usize },

    #[error("Invalid checkpoint field: {reason}")]
    InvalidField { reason: String },

    // Backend errors
    #[error("Network error during {phase}: {reason}")]
    Network { phase: String, reason: String },

    #[error("Backend rejected {phase} ({status}): {body}")]
    Backend {
        phase: String,
        status: u16,
        body: String,
    },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CaptureError {
    fn from(err: serde_json::Error) -> Self {
        CaptureError::Serialization(err.to_string())
    }
}

impl CaptureError {
    /// Whether the error came from talking to the reconstruction backend
    pub fn is_network(&self) -> bool {
        matches!(self, CaptureError::Network { .. } | CaptureError::Backend { .. })
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;
