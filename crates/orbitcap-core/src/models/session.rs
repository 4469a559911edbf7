use serde::{Deserialize, Serialize};
use std::fmt;

/// High-level lifecycle of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    NotSet,
    Initialize,
    Detecting,
    Positioning,
    Capturing1,
    Capturing2,
    Training,
    Feedback,
    ReadyToRecapture,
    Failed,
}

impl SessionState {
    pub fn is_capturing(&self) -> bool {
        matches!(self, SessionState::Capturing1 | SessionState::Capturing2)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::NotSet => "notSet",
            SessionState::Initialize => "initialize",
            SessionState::Detecting => "detecting",
            SessionState::Positioning => "positioning",
            SessionState::Capturing1 => "capturing1",
            SessionState::Capturing2 => "capturing2",
            SessionState::Training => "training",
            SessionState::Feedback => "feedback",
            SessionState::ReadyToRecapture => "readyToRecapture",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How frame captures are triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Capture only on explicit request
    #[default]
    Manual,
    /// Capture on a fixed timer
    Auto,
}

impl CaptureMode {
    pub fn toggled(self) -> Self {
        match self {
            CaptureMode::Manual => CaptureMode::Auto,
            CaptureMode::Auto => CaptureMode::Manual,
        }
    }
}
