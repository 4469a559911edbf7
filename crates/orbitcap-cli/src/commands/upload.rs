//! Upload command implementation

use crate::cli::UploadArgs;
use crate::output::OutputWriter;
use crate::output_types::UploadOutput;
use crate::progress::follow_upload;
use anyhow::{bail, Context, Result};
use orbitcap_core::config::LayeredConfig;
use orbitcap_store::CaptureFolder;
use orbitcap_upload::{HttpBackend, UploadJob, UploadRequest};
use std::sync::Arc;

use super::capture_dir;

pub async fn execute(args: UploadArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let dir = capture_dir(config, &args.name)?;
    let folder = CaptureFolder::load(&dir).await;
    if folder.is_empty() {
        bail!("Capture '{}' has no images to upload", args.name);
    }

    if !args.resume && folder.is_reupload().await {
        output.info(format!(
            "'{}' already has a remote capture. Resuming it instead of creating a new one.",
            args.name
        ));
    }

    let backend = Arc::new(HttpBackend::new(config.backend_url.value.clone()));
    let job = UploadJob::new(&folder, backend);

    let name = args.remote_name.unwrap_or_else(|| folder.name());
    let mut request = UploadRequest::new(name, args.task);
    if args.resume {
        request = request.resume();
    }

    let bar = (!output.is_json()).then(|| follow_upload(job.progress()));
    let result = job.upload(&request).await;
    if let Some(bar) = bar {
        let _ = bar.await;
    }

    let receipt = result.with_context(|| {
        format!("Upload of '{}' to {} failed", args.name, config.backend_url.value)
    })?;

    if output.is_json() {
        return output.result(UploadOutput {
            folder: folder.name(),
            capture_id: receipt.capture_id,
            name: receipt.name,
            task: receipt.task,
            progress: job.current(),
        });
    }

    output.success(format!("Uploaded '{}' as capture {}", args.name, receipt.capture_id));
    if args.task.generates_reconstruction() {
        output.info(format!("Queued {} reconstruction", receipt.task));
    }
    Ok(())
}
