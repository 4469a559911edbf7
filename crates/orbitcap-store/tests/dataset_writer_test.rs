//! Integration tests for the dataset writer and capture folder index
//!
//! These tests write real capture folders into a temporary directory and read
//! them back through the folder index and sentinel helpers.

use nalgebra::Matrix4;
use orbitcap_core::error::CaptureError;
use orbitcap_core::models::{CameraIntrinsics, CapturedFrame, Manifest, TaskType, UploadReceipt};
use orbitcap_store::sentinel::{self, MANIFEST_FILE};
use orbitcap_store::{list_folders, remove_folder, CaptureFolder, DatasetWriter, WriterOptions};
use std::time::Duration;
use tempfile::TempDir;

fn frame(width: u32, height: u32, fl: f32, x: f32) -> CapturedFrame {
    let mut transform = Matrix4::identity();
    transform[(0, 3)] = x;
    CapturedFrame {
        image: format!("png-{}", x).into_bytes(),
        depth: Some(vec![0, 1, 2, 3]),
        intrinsics: CameraIntrinsics {
            focal_length_x: fl,
            focal_length_y: fl,
            principal_point_x: width as f32 / 2.0,
            principal_point_y: height as f32 / 2.0,
        },
        width,
        height,
        transform,
        timestamp: x as f64,
    }
}

#[tokio::test]
async fn test_first_frame_defines_manifest_geometry() {
    let root = TempDir::new().unwrap();
    let mut writer = DatasetWriter::new(WriterOptions::new(root.path()));
    let folder = writer.initialize_session_named("mug").await.unwrap();

    writer.write_frame(frame(1920, 1440, 1000.0, 0.0)).unwrap();
    writer.write_frame(frame(640, 480, 500.0, 1.0)).unwrap();
    writer.write_frame(frame(800, 600, 700.0, 2.0)).unwrap();

    let path = writer.finalize().await.unwrap();
    assert_eq!(path, folder.join(MANIFEST_FILE));
    assert!(!writer.is_active());

    let manifest = sentinel::load_manifest(&folder).await.unwrap();
    assert_eq!(manifest.width, 1920);
    assert_eq!(manifest.height, 1440);
    assert_eq!(manifest.focal_length_x, 1000.0);
    assert_eq!(manifest.depth_integer_scale, Some(1.0));

    let names: Vec<&str> = manifest.frames.iter().map(|f| f.file_path.as_str()).collect();
    assert_eq!(names, vec!["IMG_0000.png", "IMG_0001.png", "IMG_0002.png"]);
    assert_eq!(manifest.frames[1].width, 640);
    assert_eq!(manifest.frames[2].transform_matrix[0][3], 2.0);
}

#[tokio::test]
async fn test_finalize_writes_images_and_readable_manifest() {
    let root = TempDir::new().unwrap();
    let mut writer = DatasetWriter::new(WriterOptions {
        root: root.path().to_path_buf(),
        use_depth: true,
        depth_source: Some("lidar/scene".to_string()),
    });
    let folder = writer.initialize_session().await.unwrap();

    writer.write_frame(frame(640, 480, 500.0, 0.5)).unwrap();
    writer.finalize().await.unwrap();

    assert_eq!(tokio::fs::read(folder.join("IMG_0000.png")).await.unwrap(), b"png-0.5");
    assert!(folder.join("IMG_0000_depth.TIF").exists());

    let raw = tokio::fs::read_to_string(folder.join(MANIFEST_FILE)).await.unwrap();
    assert!(raw.contains("\"lidar/scene\""));
    assert!(!raw.contains("\\/"));
    assert!(raw.contains("\"fl_x\""));

    let reparsed = Manifest::from_json(&raw).unwrap();
    assert_eq!(reparsed.frames.len(), 1);
    assert_eq!(reparsed.frames[0].depth_path.as_deref(), Some("IMG_0000_depth.TIF"));
}

#[tokio::test]
async fn test_failed_image_writes_keep_counter() {
    let root = TempDir::new().unwrap();
    let mut writer = DatasetWriter::new(WriterOptions::new(root.path()));
    let folder = writer.initialize_session_named("vanishing").await.unwrap();

    // images can no longer be written once the folder is gone
    tokio::fs::remove_dir_all(&folder).await.unwrap();

    assert_eq!(writer.write_frame(frame(640, 480, 500.0, 0.0)).unwrap(), 0);
    assert_eq!(writer.write_frame(frame(640, 480, 500.0, 1.0)).unwrap(), 1);
    assert_eq!(writer.frame_count(), 2);
    assert_eq!(writer.manifest().unwrap().frames.len(), 2);

    let err = writer.finalize().await.unwrap_err();
    assert!(matches!(err, CaptureError::Io(_)));
}

#[tokio::test]
async fn test_clean_removes_folder() {
    let root = TempDir::new().unwrap();
    let mut writer = DatasetWriter::new(WriterOptions::new(root.path()));
    let folder = writer.initialize_session_named("discard").await.unwrap();
    writer.write_frame(frame(640, 480, 500.0, 0.0)).unwrap();

    writer.clean().unwrap().await.unwrap();
    assert!(!folder.exists());
    assert!(!writer.is_active());
    assert!(writer.clean().is_none());
}

#[tokio::test]
async fn test_folder_index_over_written_session() {
    let root = TempDir::new().unwrap();
    let mut writer = DatasetWriter::new(WriterOptions::new(root.path()));

    let older = writer.initialize_session_named("240101000000").await.unwrap();
    writer.write_frame(frame(640, 480, 500.0, 0.0)).unwrap();
    writer.finalize().await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;

    let newer = writer.initialize_session_named("240101000100").await.unwrap();
    for i in 0..3 {
        writer.write_frame(frame(640, 480, 500.0, i as f32)).unwrap();
    }
    writer.finalize().await.unwrap();

    assert_eq!(list_folders(root.path()).await, vec![newer.clone(), older.clone()]);

    let folder = CaptureFolder::load(&newer).await;
    assert_eq!(folder.name(), "240101000100");
    assert_eq!(folder.len(), 3);
    assert!(folder.items().iter().all(|item| item.depth_path.is_some()));
    assert!(!folder.is_reupload().await);
    assert_eq!(folder.receipt().await, UploadReceipt::not_uploaded());
    assert_eq!(folder.task().await, "");

    sentinel::write_capture_id(&newer, "66f0c1").await.unwrap();
    sentinel::write_capture_task(&newer, TaskType::GaussianSplatting).await.unwrap();
    assert!(folder.is_reupload().await);
    assert_eq!(folder.task().await, "GS");

    remove_folder(&older).await.unwrap();
    assert_eq!(list_folders(root.path()).await, vec![newer]);
}
