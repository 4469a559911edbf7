use clap::{Parser, Subcommand};
use orbitcap_core::models::TaskType;
use std::path::PathBuf;

/// OrbitCap - Guided photogrammetry capture
#[derive(Parser, Debug)]
#[command(name = "orbitcap")]
#[command(about = "Guided photogrammetry capture and upload", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./orbitcap.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the capture folders
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Reconstruction backend base URL
    #[arg(long, global = true, value_name = "URL")]
    pub backend: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List capture folders, newest first
    List(ListArgs),

    /// Show the images and upload status of a capture folder
    Show(ShowArgs),

    /// Delete a capture folder or a single image from it
    Delete(DeleteArgs),

    /// Upload a capture folder to the reconstruction backend
    Upload(UploadArgs),

    /// Show effective configuration and where each value came from
    Config,

    /// Run a capture session with a scripted orbit around the anchor
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only show folders that were uploaded
    #[arg(long)]
    pub uploaded: bool,
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Capture folder name
    pub name: String,
}

#[derive(Parser, Debug)]
pub struct DeleteArgs {
    /// Capture folder name
    pub name: String,

    /// Remove only the image with this id
    #[arg(long, value_name = "ID")]
    pub item: Option<u32>,
}

#[derive(Parser, Debug)]
pub struct UploadArgs {
    /// Capture folder name
    pub name: String,

    /// Name of the remote capture (defaults to the folder name)
    #[arg(long = "as", value_name = "NAME")]
    pub remote_name: Option<String>,

    /// Reconstruction task to queue after upload (colmap, gs, sugar, none)
    #[arg(long, default_value = "none")]
    pub task: TaskType,

    /// Resume against the remote capture created by an earlier upload
    #[arg(long)]
    pub resume: bool,
}

#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Image file used for every captured frame
    #[arg(long, value_name = "FILE")]
    pub image: PathBuf,

    /// Depth map file stored next to every frame
    #[arg(long, value_name = "FILE")]
    pub depth: Option<PathBuf>,

    /// Capture folder name (defaults to a timestamp)
    #[arg(long)]
    pub name: Option<String>,

    /// Number of checkpoint rings (1 or 2)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub rings: Option<u8>,

    /// Checkpoints per ring
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub points: Option<u32>,

    /// Completion policy: "all" or a minimum number of checkpoints
    #[arg(long)]
    pub completion: Option<String>,

    /// Reported image width in pixels
    #[arg(long, default_value = "1920")]
    pub width: u32,

    /// Reported image height in pixels
    #[arg(long, default_value = "1440")]
    pub height: u32,

    /// Capture on the auto-capture timer instead of explicit requests
    #[arg(long)]
    pub auto: bool,

    /// Do not store depth maps
    #[arg(long)]
    pub no_depth: bool,
}
