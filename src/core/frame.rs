//! Logic frames and sleep directives.
//!
//! All scheduling state is an absolute frame number, never a countdown, so a
//! saved game or a fast-forward only needs a comparison against "now".

use serde::{Deserialize, Serialize};

/// One discrete simulation step.
pub type Frame = u32;

/// Wake frame meaning "never, until someone wakes me".
pub const FOREVER: Frame = Frame::MAX;

/// What an update module asks of the scheduler after it runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateSleep {
    /// Run again on the next frame.
    NextFrame,
    /// Sleep until the given absolute frame.
    Until(Frame),
    /// Sleep until explicitly woken.
    Forever,
}

impl UpdateSleep {
    /// Sleep for `frames` frames after `now` (at least one).
    #[must_use]
    pub fn frames(now: Frame, frames: u32) -> Self {
        UpdateSleep::Until(now.saturating_add(frames.max(1)))
    }

    /// The absolute wake frame this directive resolves to when issued at `now`.
    ///
    /// Requests for the current or a past frame resolve to the next frame.
    #[must_use]
    pub fn wake_frame(self, now: Frame) -> Frame {
        match self {
            UpdateSleep::NextFrame => now.saturating_add(1),
            UpdateSleep::Until(frame) => frame.max(now.saturating_add(1)),
            UpdateSleep::Forever => FOREVER,
        }
    }
}
