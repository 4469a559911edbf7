use indicatif::{ProgressBar, ProgressStyle};
use orbitcap_upload::{UploadProgress, UploadState};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Create a progress bar for determinate progress
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg}\n[{bar:40.cyan/blue}] {pos}/{len} ({percent}%) ETA: {eta}")
    {
        pb.set_style(style.progress_chars("█▓▒░ "));
    }
    pb.set_message(message.to_string());
    pb
}

/// Finish a progress bar with success message
pub fn finish_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✓ {}", message));
}

/// Finish a progress bar with error message
pub fn finish_error(pb: &ProgressBar, message: &str) {
    pb.abandon_with_message(format!("✗ {}", message));
}

/// Mirror upload progress onto a progress bar until the job finishes
pub fn follow_upload(mut progress: watch::Receiver<UploadProgress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let pb = create_progress_bar(0, "Loading images...");
        loop {
            let current = progress.borrow_and_update().clone();
            pb.set_length(current.total as u64);
            pb.set_position(current.uploaded as u64);
            pb.set_message(phase_message(current.state));

            if current.finished {
                match current.error {
                    Some(error) => finish_error(&pb, &error),
                    None => finish_success(&pb, &format!("Uploaded {} images", current.uploaded)),
                }
                return;
            }
            if progress.changed().await.is_err() {
                pb.finish_and_clear();
                return;
            }
        }
    })
}

fn phase_message(state: UploadState) -> &'static str {
    match state {
        UploadState::Idle => "Waiting...",
        UploadState::Loading | UploadState::DoneLoad => "Loading images...",
        UploadState::CallingCreateCapture | UploadState::DoneCreateCapture => "Creating remote capture...",
        UploadState::CallingUpdateCapture | UploadState::DoneUpdateCapture => "Updating remote capture...",
        UploadState::CallingUploadImage | UploadState::DoneUploadImage => "Uploading images...",
        UploadState::CallingLockCapture | UploadState::DoneLockCapture => "Locking capture...",
        UploadState::CallingCreateTask | UploadState::DoneCreateTask => "Queueing reconstruction...",
        UploadState::Failed => "Upload failed",
    }
}
