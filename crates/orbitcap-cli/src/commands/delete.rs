//! Delete command implementation

use crate::cli::DeleteArgs;
use crate::output::OutputWriter;
use crate::output_types::DeleteOutput;
use anyhow::{bail, Context, Result};
use orbitcap_core::config::LayeredConfig;
use orbitcap_store::{remove_folder, CaptureFolder};

use super::capture_dir;

pub async fn execute(args: DeleteArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let dir = capture_dir(config, &args.name)?;

    let Some(id) = args.item else {
        remove_folder(&dir).await.with_context(|| format!("Failed to delete {}", dir.display()))?;
        if output.is_json() {
            return output.result(DeleteOutput { name: args.name, item: None, remaining_items: 0 });
        }
        output.success(format!("Deleted capture '{}'", args.name));
        return Ok(());
    };

    let mut folder = CaptureFolder::load(&dir).await;
    let Some(removal) = folder.remove_item(id, true) else {
        bail!("Capture '{}' has no image with id {}", args.name, id);
    };
    removal.await.context("Image deletion task failed")?;

    if output.is_json() {
        return output.result(DeleteOutput {
            name: args.name,
            item: Some(id),
            remaining_items: folder.len(),
        });
    }
    output.success(format!("Deleted image {} from '{}' ({} left)", id, args.name, folder.len()));
    output.warning("metadata.json still lists the deleted frame");
    Ok(())
}
