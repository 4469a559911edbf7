use orbitcap_core::models::SessionState;
use std::time::Duration;

/// Side effect required by a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Stop the auto-capture timer
    StopAutoCapture,
    /// Cancel a pending feedback transition
    CancelFeedback,
    /// Remove the checkpoint field and anchored visuals
    TearDownField,
    /// Drop the unfinished dataset and delete its folder
    DiscardDataset,
    /// Allocate a fresh capture folder
    OpenDataset,
    /// Build the checkpoint field around the current anchor
    BuildField,
    /// Write the manifest and close the dataset
    FinalizeDataset,
    /// Move to `Feedback` once `delay` has elapsed
    ScheduleFeedback { delay: Duration },
    /// Surface the failure to the host
    ReportFailure,
}

impl Effect {
    /// Effects carried out by the driver rather than the session
    pub fn is_timer(&self) -> bool {
        matches!(self, Effect::StopAutoCapture | Effect::CancelFeedback | Effect::ScheduleFeedback { .. })
    }
}

/// Session facts the planner needs besides the two states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionContext {
    /// A checkpoint field exists for the current anchor
    pub field_present: bool,

    /// The dataset writer has an open session
    pub dataset_open: bool,

    pub feedback_delay: Duration,
}

/// Plan the effects of moving from `from` to `to`.
///
/// Every pair of states is allowed; re-entering the current state plans
/// nothing. Effects are listed in execution order: teardown of the state
/// being left comes before setup of the state being entered.
pub fn plan_transition(from: SessionState, to: SessionState, ctx: TransitionContext) -> Vec<Effect> {
    use SessionState::*;

    let mut effects = Vec::new();
    if from == to {
        return effects;
    }

    if from.is_capturing() && !to.is_capturing() {
        effects.push(Effect::StopAutoCapture);
    }
    if from == Training {
        effects.push(Effect::CancelFeedback);
    }

    match to {
        NotSet | Initialize => {
            if ctx.field_present {
                effects.push(Effect::TearDownField);
            }
            if ctx.dataset_open {
                effects.push(Effect::DiscardDataset);
            }
        }
        Detecting => effects.push(Effect::TearDownField),
        Capturing1 | Capturing2 => {
            if !ctx.dataset_open {
                effects.push(Effect::OpenDataset);
            }
            if !ctx.field_present {
                effects.push(Effect::BuildField);
            }
        }
        Training => {
            if ctx.dataset_open {
                effects.push(Effect::FinalizeDataset);
            }
            effects.push(Effect::ScheduleFeedback { delay: ctx.feedback_delay });
        }
        Failed => effects.push(Effect::ReportFailure),
        Positioning | Feedback | ReadyToRecapture => {}
    }

    effects
}
