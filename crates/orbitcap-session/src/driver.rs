//! Single-writer actor around a [`CaptureSession`]
//!
//! Every mutation is a [`Command`] on an mpsc channel; replies travel back on
//! oneshot channels and the latest [`SessionSnapshot`] is published on a
//! watch channel before each reply and after each command. Frame grabs and
//! the feedback timer run as separate tasks and report back through an
//! internal channel, so pose handling never waits on them.

use orbitcap_core::error::{CaptureError, Result};
use orbitcap_core::models::{CameraPose, CaptureMode, CapturedFrame, SessionState, Vec3};
use orbitcap_core::ports::{FrameGrab, FrameSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::session::{CaptureSession, FrameCaptureResult, SessionSnapshot};
use crate::state::Effect;

/// Bound on queued commands; poses beyond it are dropped
const COMMAND_BUFFER: usize = 64;

/// Shortest auto-capture period the driver will schedule
const MIN_AUTO_CAPTURE_INTERVAL: Duration = Duration::from_millis(1);

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    SetAnchor { anchor: Vec3, reply: Reply<()> },
    Transition { to: SessionState, reply: Reply<()> },
    Pose(CameraPose),
    Capture { reply: Reply<FrameCaptureResult> },
    SetMode { mode: Option<CaptureMode>, reply: Reply<CaptureMode> },
    Shutdown { reply: Reply<()> },
}

enum Internal {
    FrameGrabbed { grab: Result<FrameGrab>, reply: Option<Reply<FrameCaptureResult>> },
    FeedbackDue { generation: u64 },
}

/// Cloneable handle to a running session driver
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(build(tx)).await.map_err(|_| CaptureError::SessionClosed)?;
        rx.await.map_err(|_| CaptureError::SessionClosed)?
    }

    pub async fn set_anchor(&self, anchor: Vec3) -> Result<()> {
        self.request(|reply| Command::SetAnchor { anchor, reply }).await
    }

    pub async fn transition(&self, to: SessionState) -> Result<()> {
        self.request(|reply| Command::Transition { to, reply }).await
    }

    /// Deliver a live pose without waiting.
    ///
    /// Returns `false` when the driver is busy and the pose was dropped; the
    /// next pose supersedes it anyway.
    pub fn pose(&self, pose: CameraPose) -> Result<bool> {
        match self.commands.try_send(Command::Pose(pose)) {
            Ok(()) => Ok(true),
            Err(mpsc::error::TrySendError::Full(_)) => Ok(false),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(CaptureError::SessionClosed),
        }
    }

    /// Request a capture and wait for the frame to be stored or refused
    pub async fn capture(&self) -> Result<FrameCaptureResult> {
        self.request(|reply| Command::Capture { reply }).await
    }

    pub async fn set_mode(&self, mode: CaptureMode) -> Result<CaptureMode> {
        self.request(|reply| Command::SetMode { mode: Some(mode), reply }).await
    }

    /// Switch between manual and auto capture, returning the new mode
    pub async fn toggle_mode(&self) -> Result<CaptureMode> {
        self.request(|reply| Command::SetMode { mode: None, reply }).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx.wait_for(|s| predicate(s)).await.map_err(|_| CaptureError::SessionClosed)?;
        Ok(snapshot.clone())
    }

    /// Stop the driver once queued commands are handled
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}

/// Start a driver task owning `session`
pub fn spawn_session(
    session: CaptureSession,
    frames: Arc<dyn FrameSource>,
) -> (SessionHandle, JoinHandle<()>) {
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
    let (internal_tx, internal_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());

    let driver = Driver {
        session,
        frames,
        internal_tx,
        snapshot_tx,
        auto_capture: None,
        feedback: None,
        feedback_generation: 0,
    };
    let task = tokio::spawn(driver.run(commands_rx, internal_rx));

    (SessionHandle { commands: commands_tx, snapshots: snapshot_rx }, task)
}

struct Driver {
    session: CaptureSession,
    frames: Arc<dyn FrameSource>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    auto_capture: Option<Interval>,
    feedback: Option<JoinHandle<()>>,
    feedback_generation: u64,
}

impl Driver {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        tracing::debug!("Session driver started");

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if let Command::Shutdown { reply } = command {
                        self.respond(reply, Ok(()));
                        break;
                    }
                    self.handle_command(command).await;
                }
                Some(event) = internal.recv() => self.handle_internal(event).await,
                _ = tick(&mut self.auto_capture) => self.request_capture(None),
            }

            self.publish();
        }

        self.cancel_feedback();
        tracing::debug!("Session driver stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetAnchor { anchor, reply } => {
                self.session.set_anchor(anchor);
                self.respond(reply, Ok(()));
            }
            Command::Transition { to, reply } => {
                let result = self.transition(to).await;
                self.respond(reply, result);
            }
            Command::Pose(pose) => {
                self.session.on_pose(&pose);
            }
            Command::Capture { reply } => self.request_capture(Some(reply)),
            Command::SetMode { mode, reply } => {
                let mode = mode.unwrap_or_else(|| self.session.mode().toggled());
                self.session.set_mode(mode);
                self.respond(reply, Ok(mode));
            }
            Command::Shutdown { reply } => self.respond(reply, Ok(())),
        }
    }

    async fn handle_internal(&mut self, event: Internal) {
        match event {
            Internal::FrameGrabbed { grab, reply } => {
                self.session.end_grab();
                let result = match grab {
                    Ok(FrameGrab::Frame(frame)) => self.accept(*frame).await,
                    Ok(FrameGrab::Cancelled) => {
                        tracing::debug!("Frame grab cancelled");
                        Ok(FrameCaptureResult::Cancelled)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Frame grab failed");
                        Err(e)
                    }
                };
                match reply {
                    Some(reply) => self.respond(reply, result),
                    None => {
                        if let Ok(FrameCaptureResult::Rejected(reason)) = &result {
                            tracing::debug!(%reason, "Auto capture frame rejected");
                        }
                    }
                }
            }
            Internal::FeedbackDue { generation } => {
                if generation != self.feedback_generation {
                    return;
                }
                self.feedback = None;
                if self.session.state() == SessionState::Training {
                    if let Err(e) = self.transition(SessionState::Feedback).await {
                        tracing::error!(error = %e, "Feedback transition failed");
                    }
                }
            }
        }
    }

    /// Store a grabbed frame, leaving capture once the field is complete
    async fn accept(&mut self, frame: CapturedFrame) -> Result<FrameCaptureResult> {
        let result = self.session.accept_frame(frame)?;
        if self.session.capture_complete() {
            tracing::info!("All required checkpoints captured");
            self.transition(SessionState::Training).await?;
        }
        Ok(result)
    }

    /// Start a frame grab. `reply` is set for explicit requests and unset for
    /// auto-capture ticks.
    fn request_capture(&mut self, reply: Option<Reply<FrameCaptureResult>>) {
        let check = match reply {
            Some(_) => self.session.check_capture_request(),
            None => self.session.check_capture(),
        };
        if let Err(reason) = check {
            match reply {
                Some(reply) => self.respond(reply, Ok(FrameCaptureResult::Rejected(reason))),
                None => tracing::trace!(%reason, "Auto capture skipped"),
            }
            return;
        }

        self.session.begin_grab();
        let frames = Arc::clone(&self.frames);
        let internal = self.internal_tx.clone();
        tokio::spawn(async move {
            let grab = frames.grab_frame().await;
            let _ = internal.send(Internal::FrameGrabbed { grab, reply });
        });
    }

    /// Bring timers and the published snapshot up to date with the session
    fn publish(&mut self) {
        self.sync_timers();
        self.snapshot_tx.send_replace(self.session.snapshot());
    }

    /// Reply once the snapshot reflecting the outcome is visible
    fn respond<T>(&mut self, reply: Reply<T>, result: Result<T>) {
        self.publish();
        let _ = reply.send(result);
    }

    async fn transition(&mut self, to: SessionState) -> Result<()> {
        let effects = self.session.transition(to).await?;
        for effect in effects.into_iter().filter(Effect::is_timer) {
            match effect {
                Effect::ScheduleFeedback { delay } => self.schedule_feedback(delay),
                Effect::CancelFeedback => self.cancel_feedback(),
                Effect::StopAutoCapture => self.auto_capture = None,
                _ => {}
            }
        }
        Ok(())
    }

    fn schedule_feedback(&mut self, delay: Duration) {
        self.cancel_feedback();
        let generation = self.feedback_generation;
        let internal = self.internal_tx.clone();

        tracing::debug!(delay_ms = delay.as_millis() as u64, "Feedback scheduled");
        self.feedback = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = internal.send(Internal::FeedbackDue { generation });
        }));
    }

    fn cancel_feedback(&mut self) {
        self.feedback_generation += 1;
        if let Some(handle) = self.feedback.take() {
            handle.abort();
            tracing::debug!("Feedback cancelled");
        }
    }

    /// Keep timers consistent with the session after any command, including
    /// failures that skipped the planned timer effects
    fn sync_timers(&mut self) {
        let state = self.session.state();
        if state != SessionState::Training && self.feedback.is_some() {
            self.cancel_feedback();
        }

        let wants_auto = state.is_capturing() && self.session.mode() == CaptureMode::Auto;
        match (wants_auto, self.auto_capture.is_some()) {
            (true, false) => {
                let period = self.session.config().auto_capture_interval.max(MIN_AUTO_CAPTURE_INTERVAL);
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.auto_capture = Some(interval);
                tracing::debug!(period_ms = period.as_millis() as u64, "Auto capture started");
            }
            (false, true) => {
                self.auto_capture = None;
                tracing::debug!("Auto capture stopped");
            }
            _ => {}
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
