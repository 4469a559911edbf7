//! Simulate command implementation
//!
//! Runs a real capture session against a scripted camera: the anchor sits at
//! the origin and the camera visits every checkpoint in index order.

use crate::cli::SimulateArgs;
use crate::output::OutputWriter;
use crate::output_types::SimulateOutput;
use crate::simulate::{orbit_positions, LogObserver, StillCamera};
use anyhow::{bail, Context, Result};
use orbitcap_core::config::{parse_completion, CliConfigOverrides, LayeredConfig};
use orbitcap_core::models::{CaptureMode, SessionState, Vec3};
use orbitcap_core::ports::FixedMotion;
use orbitcap_session::{spawn_session, CaptureSession, FrameCaptureResult, SessionConfig};
use orbitcap_store::{DatasetWriter, WriterOptions};
use orbitcap_track::CheckpointField;
use std::sync::Arc;

/// Fold the simulate flags into the CLI configuration layer
pub fn apply_overrides(args: &SimulateArgs, overrides: &mut CliConfigOverrides) -> Result<()> {
    overrides.ring_count = args.rings;
    overrides.points_per_ring = args.points.map(|p| p as usize);
    if let Some(completion) = &args.completion {
        overrides.completion = Some(parse_completion(completion)?);
    }
    if args.no_depth {
        overrides.use_depth = Some(false);
    }
    Ok(())
}

pub async fn execute(args: SimulateArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let image = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read image {}", args.image.display()))?;
    let depth = match &args.depth {
        Some(path) => Some(
            tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read depth map {}", path.display()))?,
        ),
        None => None,
    };

    let session_config = SessionConfig::from_config(config);
    let anchor = Vec3::zeros();
    let field = CheckpointField::build(anchor, session_config.field.clone())?;
    let auto_interval = session_config.auto_capture_interval;

    let mut writer = DatasetWriter::new(WriterOptions::from_config(config));
    if let Some(name) = &args.name {
        writer.initialize_session_named(name).await?;
    }

    let session = CaptureSession::new(
        session_config,
        writer,
        Arc::new(FixedMotion::still()),
        Arc::new(LogObserver),
    );
    let camera = Arc::new(StillCamera::new(image, depth, args.width, args.height));
    let (handle, task) = spawn_session(session, camera.clone());

    if args.auto {
        handle.set_mode(CaptureMode::Auto).await?;
    }
    handle.set_anchor(anchor).await?;
    for state in [SessionState::Detecting, SessionState::Positioning, SessionState::Capturing1] {
        handle.transition(state).await?;
    }
    let dataset = handle.snapshot().dataset_dir;
    if !output.is_json() {
        output.info(format!("Capturing {} checkpoints", field.len()));
    }

    let mut accepted = 0;
    let mut rejected = 0;
    for (index, position) in orbit_positions(&field).into_iter().enumerate() {
        if handle.snapshot().state != SessionState::Capturing1 {
            break;
        }
        let pose = camera.move_to(position);
        if !handle.pose(pose)? {
            tracing::warn!(index, "Pose dropped by a busy session");
        }

        if args.auto {
            let target = index + 1;
            let wait = handle.wait_for(|s| s.captured >= target || !s.state.is_capturing());
            tokio::time::timeout(auto_interval * 3, wait)
                .await
                .with_context(|| format!("Auto capture did not reach checkpoint {}", index))??;
            accepted += 1;
            continue;
        }

        match handle.capture().await? {
            FrameCaptureResult::Accepted { checkpoint, frame_id } => {
                tracing::debug!(checkpoint, frame_id, "Frame accepted");
                accepted += 1;
            }
            FrameCaptureResult::Rejected(reason) => {
                output.warning(format!("Checkpoint {} rejected: {}", index, reason));
                rejected += 1;
            }
            FrameCaptureResult::Cancelled => rejected += 1,
        }
    }

    let snapshot = handle.snapshot();
    handle.shutdown().await?;
    task.await.context("Session driver panicked")?;

    if snapshot.state != SessionState::Training {
        bail!(
            "Capture stopped in state '{}' with {} of {} checkpoints captured",
            snapshot.state,
            snapshot.captured,
            field.len()
        );
    }

    if output.is_json() {
        return output.result(SimulateOutput { dataset, accepted, rejected, snapshot });
    }

    output.success(format!("Captured {} of {} checkpoints", snapshot.captured, field.len()));
    if let Some(dir) = dataset {
        output.kv("Dataset", dir.display());
    }
    output.kv("Accepted", accepted);
    if rejected > 0 {
        output.kv("Rejected", rejected);
    }
    Ok(())
}
