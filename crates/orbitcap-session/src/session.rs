use orbitcap_core::config::{CompletionPolicy, LayeredConfig};
use orbitcap_core::error::{CaptureError, Result};
use orbitcap_core::models::{
    CameraPose, CaptureMode, CapturedFrame, PointStatus, SessionState, Vec3,
};
use orbitcap_core::ports::{MotionSensor, SessionObserver};
use orbitcap_store::DatasetWriter;
use orbitcap_track::{CheckpointField, FieldSpec, ProximityTracker, TrackerConfig};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::state::{plan_transition, Effect, TransitionContext};

/// Tunables of a capture session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub field: FieldSpec,
    pub tracker: TrackerConfig,

    /// Captures are refused above this acceleration (g, gravity removed)
    pub motion_threshold: f64,

    pub completion: CompletionPolicy,
    pub auto_capture_interval: Duration,
    pub feedback_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            field: FieldSpec::single_ring(20, 0.15),
            tracker: TrackerConfig::default(),
            motion_threshold: 0.02,
            completion: CompletionPolicy::AllCaptured,
            auto_capture_interval: Duration::from_millis(1000),
            feedback_delay: Duration::from_millis(3000),
        }
    }
}

impl SessionConfig {
    pub fn from_config(config: &LayeredConfig) -> Self {
        Self {
            field: FieldSpec::from_config(config),
            tracker: TrackerConfig::from(config),
            motion_threshold: config.motion_threshold.value,
            completion: config.completion.value,
            auto_capture_interval: Duration::from_millis(config.auto_capture_interval_ms.value),
            feedback_delay: Duration::from_millis(config.feedback_delay_ms.value),
        }
    }
}

/// Why a capture request was refused
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// The session is not in a capturing state
    NotCapturing,
    /// No motion reading is available
    MotionUnavailable,
    /// The device is moving too fast for a sharp image
    TooMuchMotion { acceleration: f64, threshold: f64 },
    /// The camera is not aiming at any checkpoint
    NoCheckpoint,
    /// A previous frame grab has not come back yet
    GrabInFlight,
    /// Explicit requests are refused while the auto-capture timer drives captures
    AutoCaptureActive,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotCapturing => write!(f, "session is not capturing"),
            RejectReason::MotionUnavailable => write!(f, "no motion reading available"),
            RejectReason::TooMuchMotion { acceleration, threshold } => {
                write!(f, "acceleration {:.3} exceeds {:.3}", acceleration, threshold)
            }
            RejectReason::NoCheckpoint => write!(f, "camera is not aiming at a checkpoint"),
            RejectReason::GrabInFlight => write!(f, "a frame grab is already in flight"),
            RejectReason::AutoCaptureActive => write!(f, "auto capture is active"),
        }
    }
}

/// Outcome of one capture request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FrameCaptureResult {
    Accepted {
        /// Checkpoint the frame was credited to
        checkpoint: usize,
        /// Dataset frame id
        frame_id: u32,
    },
    Rejected(RejectReason),
    /// The camera dropped the request
    Cancelled,
}

/// Read-only view of a session for renderers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub mode: CaptureMode,
    pub nearest: Option<usize>,
    pub statuses: Vec<PointStatus>,
    pub captured: usize,
    pub frame_count: u32,
    pub dataset_dir: Option<PathBuf>,
    pub failure: Option<String>,
}

/// One capture session around one anchor.
///
/// Owns the checkpoint field, the tracker and the dataset writer. All
/// mutation goes through `&mut self`; share it through the driver.
pub struct CaptureSession {
    config: SessionConfig,
    state: SessionState,
    mode: CaptureMode,
    anchor: Option<Vec3>,
    field: Option<CheckpointField>,
    tracker: ProximityTracker,
    nearest: Option<usize>,
    grab_in_flight: bool,
    failure: Option<String>,
    writer: DatasetWriter,
    motion: Arc<dyn MotionSensor>,
    observer: Arc<dyn SessionObserver>,
}

impl CaptureSession {
    pub fn new(
        config: SessionConfig,
        writer: DatasetWriter,
        motion: Arc<dyn MotionSensor>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        Self {
            tracker: ProximityTracker::new(config.tracker),
            config,
            state: SessionState::default(),
            mode: CaptureMode::default(),
            anchor: None,
            field: None,
            nearest: None,
            grab_in_flight: false,
            failure: None,
            writer,
            motion,
            observer,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CaptureMode) {
        if self.mode != mode {
            tracing::info!(from = ?self.mode, to = ?mode, "Capture mode changed");
            self.mode = mode;
        }
    }

    pub fn anchor(&self) -> Option<Vec3> {
        self.anchor
    }

    pub fn field(&self) -> Option<&CheckpointField> {
        self.field.as_ref()
    }

    /// Checkpoint aimed at by the last tracked pose
    pub fn nearest(&self) -> Option<usize> {
        self.nearest
    }

    pub fn writer(&self) -> &DatasetWriter {
        &self.writer
    }

    /// Place the session anchor.
    ///
    /// Moving the anchor invalidates the existing field; a new one is built
    /// on the next entry into a capturing state.
    pub fn set_anchor(&mut self, anchor: Vec3) {
        if self.anchor == Some(anchor) {
            return;
        }
        tracing::debug!(anchor = ?anchor, "Anchor placed");
        self.anchor = Some(anchor);
        if self.field.is_some() {
            self.tear_down_field();
        }
    }

    /// Move to `to` and apply the effects the session owns.
    ///
    /// Returns every planned effect; the timer ones are left for the caller.
    /// If an effect fails the session ends up in `Failed` and the error is
    /// returned instead.
    pub async fn transition(&mut self, to: SessionState) -> Result<Vec<Effect>> {
        let from = self.state;
        let ctx = TransitionContext {
            field_present: self.field.is_some(),
            dataset_open: self.writer.is_active(),
            feedback_delay: self.config.feedback_delay,
        };
        let effects = plan_transition(from, to, ctx);
        if from == to {
            return Ok(effects);
        }

        tracing::debug!(from = %from, to = %to, effects = ?effects, "Session transition");
        self.state = to;
        if to != SessionState::Failed {
            self.failure = None;
        }
        self.observer.state_changed(from, to);

        for effect in &effects {
            if let Err(e) = self.apply(*effect).await {
                self.fail(&e.to_string());
                return Err(e);
            }
        }

        Ok(effects)
    }

    /// Enter `Failed`, recording `reason`.
    ///
    /// Only the state changes here; the field and dataset are kept so a
    /// later reset can clean them up.
    pub fn fail(&mut self, reason: &str) {
        let from = self.state;
        tracing::error!(from = %from, reason, "Capture session failed");

        self.state = SessionState::Failed;
        self.failure = Some(reason.to_string());
        if from != SessionState::Failed {
            self.observer.state_changed(from, SessionState::Failed);
        }
        self.observer.failed(reason);
    }

    async fn apply(&mut self, effect: Effect) -> Result<()> {
        match effect {
            Effect::TearDownField => self.tear_down_field(),
            Effect::BuildField => self.build_field()?,
            Effect::OpenDataset => {
                self.writer.initialize_session().await?;
            }
            Effect::FinalizeDataset => {
                self.writer.finalize().await?;
            }
            Effect::DiscardDataset => {
                // deletion continues in the background
                let _ = self.writer.clean();
            }
            Effect::ReportFailure => {
                let reason = self.failure.clone().unwrap_or_else(|| "session failed".to_string());
                self.observer.failed(&reason);
            }
            Effect::StopAutoCapture | Effect::CancelFeedback | Effect::ScheduleFeedback { .. } => {}
        }
        Ok(())
    }

    fn tear_down_field(&mut self) {
        if self.field.take().is_some() {
            tracing::debug!("Checkpoint field removed");
        }
        self.nearest = None;
        self.observer.track_removed();
    }

    fn build_field(&mut self) -> Result<()> {
        let anchor = self.anchor.ok_or_else(|| CaptureError::InvalidField {
            reason: "no anchor has been placed".to_string(),
        })?;
        let field = CheckpointField::build(anchor, self.config.field.clone())?;

        tracing::info!(checkpoints = field.len(), rings = field.rings().len(), "Checkpoint field created");
        if let Err(e) = self.observer.track_created(field.checkpoints()) {
            tracing::warn!(error = %e, "Checkpoint visuals failed to load");
        }

        self.field = Some(field);
        Ok(())
    }

    /// Track a live pose. Returns the checkpoint now aimed at.
    ///
    /// Poses outside capturing states, or before the field exists, are
    /// ignored.
    pub fn on_pose(&mut self, pose: &CameraPose) -> Option<usize> {
        if !self.state.is_capturing() {
            return None;
        }
        let field = self.field.as_mut()?;

        self.nearest = self.tracker.track(field, pose.position);
        self.observer.checkpoints_updated(&field.colors());
        self.nearest
    }

    /// Gate a capture request on state, motion and aim
    pub fn check_capture(&self) -> std::result::Result<usize, RejectReason> {
        if !self.state.is_capturing() || self.field.is_none() {
            return Err(RejectReason::NotCapturing);
        }
        if self.grab_in_flight {
            return Err(RejectReason::GrabInFlight);
        }

        let threshold = self.config.motion_threshold;
        match self.motion.acceleration() {
            None => return Err(RejectReason::MotionUnavailable),
            Some(acceleration) if acceleration > threshold => {
                return Err(RejectReason::TooMuchMotion { acceleration, threshold });
            }
            Some(_) => {}
        }

        self.nearest.ok_or(RejectReason::NoCheckpoint)
    }

    /// Gate an explicit capture request.
    ///
    /// Only the timer triggers captures in auto mode.
    pub fn check_capture_request(&self) -> std::result::Result<usize, RejectReason> {
        if self.state.is_capturing() && self.mode == CaptureMode::Auto {
            return Err(RejectReason::AutoCaptureActive);
        }
        self.check_capture()
    }

    /// Mark a frame grab as outstanding
    pub fn begin_grab(&mut self) {
        self.grab_in_flight = true;
    }

    pub fn end_grab(&mut self) {
        self.grab_in_flight = false;
    }

    /// Credit a grabbed frame to the checkpoint at the frame's own pose and
    /// hand it to the dataset writer
    pub fn accept_frame(&mut self, frame: CapturedFrame) -> Result<FrameCaptureResult> {
        if !self.state.is_capturing() {
            return Ok(FrameCaptureResult::Rejected(RejectReason::NotCapturing));
        }
        let Some(field) = self.field.as_mut() else {
            return Ok(FrameCaptureResult::Rejected(RejectReason::NotCapturing));
        };

        let Some(checkpoint) = self.tracker.find_nearest(field, frame.pose().position) else {
            return Ok(FrameCaptureResult::Rejected(RejectReason::NoCheckpoint));
        };

        let frame_id = self.writer.write_frame(frame)?;
        field.mark_captured(checkpoint)?;
        self.observer.checkpoints_updated(&field.colors());

        tracing::info!(
            checkpoint,
            frame_id,
            captured = field.captured_count(),
            total = field.len(),
            "Frame captured"
        );

        Ok(FrameCaptureResult::Accepted { checkpoint, frame_id })
    }

    /// Whether enough checkpoints are captured to leave the capturing state
    pub fn capture_complete(&self) -> bool {
        self.state.is_capturing()
            && self
                .field
                .as_ref()
                .is_some_and(|f| self.config.completion.is_complete(f.captured_count(), f.len()))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            mode: self.mode,
            nearest: self.nearest,
            statuses: self.field.as_ref().map(CheckpointField::statuses).unwrap_or_default(),
            captured: self.field.as_ref().map_or(0, CheckpointField::captured_count),
            frame_count: self.writer.frame_count(),
            dataset_dir: self.writer.session_dir().map(PathBuf::from),
            failure: self.failure.clone(),
        }
    }
}
