use orbitcap_core::error::{CaptureError, Result};
use orbitcap_core::models::capture::{depth_file_name, image_file_name, parse_image_id};
use orbitcap_core::models::{CaptureItem, UploadReceipt};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::task::JoinHandle;

use crate::sentinel;

/// In-memory index of the images inside one capture folder
#[derive(Debug, Clone)]
pub struct CaptureFolder {
    dir: PathBuf,
    items: Vec<CaptureItem>,
}

impl CaptureFolder {
    /// Index `dir`.
    ///
    /// A folder that cannot be read yields an empty index instead of an
    /// error.
    pub async fn load(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let items = match scan_items(&dir).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(folder = %dir.display(), error = %e, "Treating capture folder as empty");
                Vec::new()
            }
        };
        Self { dir, items }
    }

    /// Re-read the folder contents from disk
    pub async fn reload(&mut self) {
        *self = Self::load(std::mem::take(&mut self.dir)).await;
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Folder name, which doubles as the capture name
    pub fn name(&self) -> String {
        self.dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }

    /// Items ordered by id
    pub fn items(&self) -> &[CaptureItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&CaptureItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Drop an item from the index and optionally delete its files.
    ///
    /// The item leaves the index before this returns; file deletion runs in
    /// the background and its handle is returned when requested.
    pub fn remove_item(&mut self, id: u32, delete_files: bool) -> Option<JoinHandle<()>> {
        let position = self.items.iter().position(|item| item.id == id)?;
        let item = self.items.remove(position);
        tracing::info!(folder = %self.dir.display(), id, delete_files, "Removing capture item");

        if !delete_files {
            return None;
        }

        Some(tokio::spawn(async move {
            for file in item.files() {
                if let Err(e) = tokio::fs::remove_file(file).await {
                    tracing::warn!(file = %file.display(), error = %e, "Could not delete capture file");
                }
            }
        }))
    }

    /// Receipt of the last upload, or the not-uploaded placeholder
    pub async fn receipt(&self) -> UploadReceipt {
        sentinel::read_receipt(&self.dir).await
    }

    /// Task type requested at the last upload, empty if none
    pub async fn task(&self) -> String {
        sentinel::read_capture_task(&self.dir).await
    }

    /// A folder is uploaded again, not afresh, once it has a remote id
    pub async fn is_reupload(&self) -> bool {
        sentinel::has_capture_id(&self.dir).await
    }
}

/// List the images in a capture folder, ordered by id.
///
/// Only `IMG_<id>.png` files count; depth maps and other files are skipped.
pub async fn scan_items(dir: &Path) -> Result<Vec<CaptureItem>> {
    let invalid = || CaptureError::InvalidCaptureDirectory { path: dir.to_path_buf() };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|_| invalid())?;

    let mut items = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|_| invalid())? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else { continue };
        if name.starts_with('.') {
            continue;
        }
        let Some(id) = parse_image_id(name) else { continue };
        if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let depth = dir.join(depth_file_name(id));
        let depth_path = tokio::fs::try_exists(&depth).await.unwrap_or(false).then_some(depth);
        items.push(CaptureItem { id, image_path: dir.join(image_file_name(id)), depth_path });
    }

    items.sort_by_key(|item| item.id);
    Ok(items)
}

/// Capture folders under `root`, newest first.
///
/// Folders without a readable creation time sort as the oldest. An
/// unreadable root yields an empty list.
pub async fn list_folders(root: &Path) -> Vec<PathBuf> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(root = %root.display(), error = %e, "No capture folders");
            return Vec::new();
        }
    };

    let mut folders = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else { continue };
        if !metadata.is_dir() {
            continue;
        }
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        folders.push((created, entry.path()));
    }

    // newest first, ties broken by name so timestamp-named folders stay ordered
    folders.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    folders.into_iter().map(|(_, path)| path).collect()
}

/// Delete a whole capture folder
pub async fn remove_folder(dir: &Path) -> Result<()> {
    tracing::info!(folder = %dir.display(), "Removing capture folder");
    tokio::fs::remove_dir_all(dir).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn touch(dir: &Path, name: &str) {
        tokio::fs::write(dir.join(name), b"x").await.unwrap();
    }

    #[tokio::test]
    async fn test_scan_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in [
            "IMG_0010.png",
            "IMG_0002.png",
            "IMG_0002_depth.TIF",
            "IMG_0000.png",
            "metadata.json",
            "captureId.txt",
            ".IMG_0005.png",
        ] {
            touch(dir.path(), name).await;
        }

        let items = scan_items(dir.path()).await.unwrap();
        let ids: Vec<u32> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![0, 2, 10]);
        assert!(items[1].depth_path.is_some());
        assert!(items[0].depth_path.is_none());
    }

    #[tokio::test]
    async fn test_missing_folder_is_empty() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        assert!(matches!(
            scan_items(&missing).await,
            Err(CaptureError::InvalidCaptureDirectory { .. })
        ));
        assert!(CaptureFolder::load(&missing).await.is_empty());
        assert!(list_folders(&missing).await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_item_is_immediate() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "IMG_0000.png").await;
        touch(dir.path(), "IMG_0001.png").await;
        touch(dir.path(), "IMG_0001_depth.TIF").await;

        let mut folder = CaptureFolder::load(dir.path()).await;
        assert_eq!(folder.len(), 2);

        let handle = folder.remove_item(1, true).unwrap();
        assert!(folder.get(1).is_none());
        assert_eq!(folder.len(), 1);

        handle.await.unwrap();
        assert!(!dir.path().join("IMG_0001.png").exists());
        assert!(!dir.path().join("IMG_0001_depth.TIF").exists());

        assert!(folder.remove_item(0, false).is_none());
        assert!(folder.is_empty());
        assert!(dir.path().join("IMG_0000.png").exists());

        assert!(folder.remove_item(42, true).is_none());
    }
}
