//! List command implementation

use crate::cli::ListArgs;
use crate::output::OutputWriter;
use crate::output_types::FolderRow;
use anyhow::Result;
use orbitcap_core::config::LayeredConfig;
use orbitcap_store::{list_folders, CaptureFolder};

pub async fn execute(args: ListArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let root = &config.captures_root.value;
    let mut rows = Vec::new();

    for dir in list_folders(root).await {
        let folder = CaptureFolder::load(dir).await;
        let receipt = folder.receipt().await;
        if args.uploaded && !receipt.is_uploaded() {
            continue;
        }
        rows.push(FolderRow {
            name: folder.name(),
            images: folder.len(),
            remote_name: receipt.name,
            capture_id: receipt.capture_id,
            task: receipt.task,
        });
    }

    if rows.is_empty() && !output.is_json() {
        output.info(format!("No capture folders in {}", root.display()));
        return Ok(());
    }

    output.section(format!("Captures in {}", root.display()));
    output.table(rows)
}
