use orbitcap_session::SessionSnapshot;
use orbitcap_upload::UploadProgress;
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;

/// Row of the list command
#[derive(Debug, Serialize, Tabled)]
pub struct FolderRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Images")]
    pub images: usize,
    #[tabled(rename = "Remote Name")]
    pub remote_name: String,
    #[tabled(rename = "Capture ID")]
    pub capture_id: String,
    #[tabled(rename = "Task")]
    pub task: String,
}

/// Row of the show command
#[derive(Debug, Serialize, Tabled)]
pub struct ItemRow {
    #[tabled(rename = "ID")]
    pub id: u32,
    #[tabled(rename = "Image")]
    pub image: String,
    #[tabled(rename = "Depth")]
    pub depth: String,
}

/// Output for show command
#[derive(Debug, Serialize)]
pub struct ShowOutput {
    pub name: String,
    pub path: String,
    pub uploaded: bool,
    pub capture_id: String,
    pub remote_name: String,
    pub task: String,
    pub reupload_available: bool,
    pub items: Vec<ItemRow>,
}

/// Output for delete command
#[derive(Debug, Serialize)]
pub struct DeleteOutput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<u32>,
    pub remaining_items: usize,
}

/// Output for upload command
#[derive(Debug, Serialize)]
pub struct UploadOutput {
    pub folder: String,
    pub capture_id: String,
    pub name: String,
    pub task: String,
    pub progress: UploadProgress,
}

/// Row of the config command
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

/// Output for simulate command
#[derive(Debug, Serialize)]
pub struct SimulateOutput {
    pub dataset: Option<PathBuf>,
    pub accepted: usize,
    pub rejected: usize,
    pub snapshot: SessionSnapshot,
}
