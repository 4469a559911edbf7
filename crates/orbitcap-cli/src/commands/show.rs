//! Show command implementation

use crate::cli::ShowArgs;
use crate::output::OutputWriter;
use crate::output_types::{ItemRow, ShowOutput};
use anyhow::Result;
use orbitcap_core::config::LayeredConfig;
use orbitcap_store::CaptureFolder;

use super::capture_dir;

pub async fn execute(args: ShowArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let dir = capture_dir(config, &args.name)?;
    let folder = CaptureFolder::load(&dir).await;
    let receipt = folder.receipt().await;
    let task = folder.task().await;
    let reupload_available = folder.is_reupload().await;

    let items: Vec<ItemRow> = folder
        .items()
        .iter()
        .map(|item| ItemRow {
            id: item.id,
            image: file_name(&item.image_path),
            depth: item.depth_path.as_deref().map(file_name).unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    if output.is_json() {
        return output.result(ShowOutput {
            name: folder.name(),
            path: dir.display().to_string(),
            uploaded: receipt.is_uploaded(),
            capture_id: receipt.capture_id,
            remote_name: receipt.name,
            task,
            reupload_available,
            items,
        });
    }

    output.section("Capture");
    output.kv("Name", folder.name());
    output.kv("Location", dir.display());
    output.kv("Images", folder.len());

    output.section("Upload");
    if receipt.is_uploaded() {
        output.kv("Capture ID", &receipt.capture_id);
        output.kv("Remote Name", &receipt.name);
        output.kv("Task", &receipt.task);
    } else {
        output.kv("Status", &receipt.name);
        if reupload_available {
            output.info(format!(
                "An earlier upload was interrupted. Run 'orbitcap upload {} --resume' to continue it.",
                args.name
            ));
        }
    }

    output.section("Images");
    output.table(items)
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}
