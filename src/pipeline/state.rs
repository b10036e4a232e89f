/// State machine for a single capture flow on the camera screen.
///
/// `Saving` is the only state that invokes the capture pipeline. A retake
/// from `Previewing` discards the frame before any persistence, so it never
/// touches a store.
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Camera idle, ready for the shutter.
    Idle,
    /// Waiting on the camera for a frame.
    Capturing,
    /// Frame on screen, user deciding between save and retake.
    Previewing,
    /// Pipeline running. No cancellation once entered.
    Saving,
    /// Record persisted.
    Done,
    /// The camera failed to produce a frame.
    CaptureFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    ShutterPressed,
    FrameCaptured,
    CaptureErrored,
    Retake,
    SaveRequested,
    SaveCompleted,
    /// Storage rejected the save; back to the preview for a retry prompt.
    SaveFailed,
    /// Dismiss a result or error and return to the viewfinder.
    Dismissed,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid capture transition: {event:?} in {from:?}")]
pub struct InvalidTransition {
    pub from: CaptureState,
    pub event: CaptureEvent,
}

impl CaptureState {
    /// Apply an event, yielding the next state or rejecting the transition.
    pub fn apply(self, event: CaptureEvent) -> Result<CaptureState, InvalidTransition> {
        use CaptureEvent::*;
        use CaptureState::*;

        let next = match (self, event) {
            (Idle, ShutterPressed) => Capturing,
            (Capturing, FrameCaptured) => Previewing,
            (Capturing, CaptureErrored) => CaptureFailed,
            (Previewing, Retake) => Idle,
            (Previewing, SaveRequested) => Saving,
            (Saving, SaveCompleted) => Done,
            (Saving, SaveFailed) => Previewing,
            (Done, Dismissed) => Idle,
            (CaptureFailed, Dismissed) => Idle,
            (from, event) => return Err(InvalidTransition { from, event }),
        };
        Ok(next)
    }
}
