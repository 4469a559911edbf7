use orbitcap_core::config::LayeredConfig;
use orbitcap_core::error::{CaptureError, Result};
use orbitcap_core::models::capture::{depth_file_name, image_file_name};
use orbitcap_core::models::{CapturedFrame, FrameRecord, Manifest};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

use crate::sentinel::MANIFEST_FILE;

/// Folder name format: two-digit year down to seconds
const SESSION_NAME_FORMAT: &str = "%y%m%d%H%M%S";

/// Settings for a [`DatasetWriter`]
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Directory under which capture folders are created
    pub root: PathBuf,

    /// Persist depth maps when a frame carries one
    pub use_depth: bool,

    /// Recorded in the manifest as `depth_source`
    pub depth_source: Option<String>,
}

impl WriterOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), use_depth: true, depth_source: None }
    }

    pub fn from_config(config: &LayeredConfig) -> Self {
        Self {
            root: config.captures_root.value.clone(),
            use_depth: config.use_depth.value,
            depth_source: None,
        }
    }
}

/// State of the session currently being written
#[derive(Debug)]
struct ActiveSession {
    name: String,
    dir: PathBuf,
    manifest: Manifest,
    frame_counter: u32,
    pending: Vec<JoinHandle<()>>,
}

/// Append-only writer for one capture session at a time.
///
/// Frame bookkeeping (counter and manifest) happens synchronously in
/// [`write_frame`](Self::write_frame); the image bytes are written by
/// spawned tasks. [`finalize`](Self::finalize) waits for those tasks before
/// writing `metadata.json`. Spawning requires a Tokio runtime.
#[derive(Debug)]
pub struct DatasetWriter {
    options: WriterOptions,
    session: Option<ActiveSession>,
}

impl DatasetWriter {
    pub fn new(options: WriterOptions) -> Self {
        Self { options, session: None }
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    pub fn set_use_depth(&mut self, use_depth: bool) {
        self.options.use_depth = use_depth;
    }

    /// Start a session in a folder named after the current local time
    pub async fn initialize_session(&mut self) -> Result<PathBuf> {
        let name = chrono::Local::now().format(SESSION_NAME_FORMAT).to_string();
        self.initialize_session_named(&name).await
    }

    /// Start a session in `root/name`.
    ///
    /// Fails with `ProjectAlreadyExists` if the folder is already there. Any
    /// session still open on this writer is dropped without finalizing.
    pub async fn initialize_session_named(&mut self, name: &str) -> Result<PathBuf> {
        let dir = self.options.root.join(name);

        tokio::fs::create_dir_all(&self.options.root).await?;
        match tokio::fs::create_dir(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(CaptureError::ProjectAlreadyExists { path: dir });
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(previous) = self.session.take() {
            tracing::warn!(
                folder = %previous.dir.display(),
                frames = previous.frame_counter,
                "Replacing an unfinished capture session"
            );
        }

        let mut manifest = Manifest::for_new_session();
        manifest.depth_source = self.options.depth_source.clone();

        tracing::info!(folder = %dir.display(), "Capture session initialized");

        self.session = Some(ActiveSession {
            name: name.to_string(),
            dir: dir.clone(),
            manifest,
            frame_counter: 0,
            pending: Vec::new(),
        });

        Ok(dir)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_dir(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.dir.as_path())
    }

    pub fn session_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.name.as_str())
    }

    /// Number of frames accepted in the current session
    pub fn frame_count(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.frame_counter)
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.session.as_ref().map(|s| &s.manifest)
    }

    /// Record a frame and queue its image files for writing.
    ///
    /// Returns the frame's id. The id and manifest entry are assigned before
    /// any bytes hit the disk; a failed image write is logged and does not
    /// roll them back.
    pub fn write_frame(&mut self, frame: CapturedFrame) -> Result<u32> {
        let use_depth = self.options.use_depth;
        let session = self.session.as_mut().ok_or(CaptureError::SessionNotStarted)?;

        let id = session.frame_counter;
        let image_name = image_file_name(id);
        let depth = frame.depth.as_ref().filter(|_| use_depth).map(|_| depth_file_name(id));

        let record = FrameRecord::from_frame(&frame, image_name.clone(), depth.clone());
        session.manifest.push_frame(record);
        session.frame_counter += 1;

        tracing::debug!(id, file = %image_name, depth = depth.is_some(), "Frame recorded");

        session.pending.push(spawn_write(session.dir.join(&image_name), frame.image));
        if let (Some(depth_name), Some(bytes)) = (depth, frame.depth) {
            session.pending.push(spawn_write(session.dir.join(depth_name), bytes));
        }

        Ok(id)
    }

    /// Wait for queued writes, then write `metadata.json` and end the session
    pub async fn finalize(&mut self) -> Result<PathBuf> {
        let mut session = self.session.take().ok_or(CaptureError::SessionNotStarted)?;

        for handle in session.pending.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Image write task did not complete");
            }
        }

        let path = session.dir.join(MANIFEST_FILE);
        let json = session.manifest.to_json()?;
        tokio::fs::write(&path, json).await?;

        tracing::info!(
            folder = %session.dir.display(),
            frames = session.frame_counter,
            "Capture session finalized"
        );

        Ok(path)
    }

    /// Discard the current session and delete its folder in the background.
    ///
    /// Returns `None` when no session is active.
    pub fn clean(&mut self) -> Option<JoinHandle<()>> {
        let session = self.session.take()?;
        tracing::info!(folder = %session.dir.display(), "Discarding capture session");

        Some(tokio::spawn(async move {
            // let queued writes land first so they cannot recreate the folder
            for handle in session.pending {
                let _ = handle.await;
            }
            if let Err(e) = tokio::fs::remove_dir_all(&session.dir).await {
                tracing::warn!(folder = %session.dir.display(), error = %e, "Could not remove capture folder");
            }
        }))
    }
}

fn spawn_write(path: PathBuf, bytes: Vec<u8>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            tracing::warn!(file = %path.display(), error = %e, "Failed to write frame file");
        }
    })
}
