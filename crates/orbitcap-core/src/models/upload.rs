use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CaptureError;

/// Reconstruction task requested after upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskType {
    #[serde(rename = "COLMAP")]
    Colmap,
    #[serde(rename = "GS")]
    GaussianSplatting,
    #[serde(rename = "Sugar")]
    Sugar,
    #[default]
    #[serde(rename = "None")]
    None,
}

impl TaskType {
    /// Wire name sent to the backend and written to `captureTask.txt`
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Colmap => "COLMAP",
            TaskType::GaussianSplatting => "GS",
            TaskType::Sugar => "Sugar",
            TaskType::None => "None",
        }
    }

    /// Whether this task asks the backend to build a reconstruction
    pub fn generates_reconstruction(&self) -> bool {
        !matches!(self, TaskType::None)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "colmap" => Ok(TaskType::Colmap),
            "gs" | "gaussian-splatting" => Ok(TaskType::GaussianSplatting),
            "sugar" => Ok(TaskType::Sugar),
            "none" | "" => Ok(TaskType::None),
            _ => Err(CaptureError::ConfigInvalid {
                key: "task".to_string(),
                reason: format!("Unknown task type: {}. Use colmap, gs, sugar, or none", s),
            }),
        }
    }
}

/// Camera geometry attached to the remote capture record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraMetadata {
    pub width: u32,
    pub height: u32,
}

/// Receipt stored in `uploadInfo.txt` once an upload finishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    #[serde(rename = "captureID")]
    pub capture_id: String,

    pub name: String,

    pub task: String,
}

impl UploadReceipt {
    pub fn new(capture_id: impl Into<String>, name: impl Into<String>, task: TaskType) -> Self {
        Self { capture_id: capture_id.into(), name: name.into(), task: task.as_str().to_string() }
    }

    /// Placeholder shown for folders that were never uploaded
    pub fn not_uploaded() -> Self {
        Self {
            capture_id: String::new(),
            name: "Not Uploaded Yet".to_string(),
            task: TaskType::None.as_str().to_string(),
        }
    }

    pub fn is_uploaded(&self) -> bool {
        !self.capture_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_parsing() {
        assert_eq!("COLMAP".parse::<TaskType>().unwrap(), TaskType::Colmap);
        assert_eq!("gs".parse::<TaskType>().unwrap(), TaskType::GaussianSplatting);
        assert_eq!("Sugar".parse::<TaskType>().unwrap(), TaskType::Sugar);
        assert_eq!("none".parse::<TaskType>().unwrap(), TaskType::None);
        assert!("nerfacto".parse::<TaskType>().is_err());
    }

    #[test]
    fn test_receipt_keys() {
        let receipt = UploadReceipt::new("66f0c1", "mug", TaskType::GaussianSplatting);
        let json = serde_json::to_value(&receipt).unwrap();

        assert_eq!(json["captureID"], "66f0c1");
        assert_eq!(json["name"], "mug");
        assert_eq!(json["task"], "GS");
    }

    #[test]
    fn test_not_uploaded_placeholder() {
        let receipt = UploadReceipt::not_uploaded();
        assert!(!receipt.is_uploaded());
        assert_eq!(receipt.task, "None");
    }
}
