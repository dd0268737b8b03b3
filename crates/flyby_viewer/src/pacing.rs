//! Fixed-rate frame pacing.

use std::time::{Duration, Instant};

/// Spreads frames over a fixed time budget; the event loop waits off whatever
/// part of the budget a frame did not use.
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    budget: Duration,
    frame_start: Instant,
}

impl FramePacer {
    pub fn new(target_fps: u32) -> Self {
        Self::with_start(target_fps, Instant::now())
    }

    fn with_start(target_fps: u32, frame_start: Instant) -> Self {
        Self {
            budget: Duration::from_secs(1) / target_fps.max(1),
            frame_start,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Mark the start of a frame.
    pub fn begin_frame(&mut self, now: Instant) {
        self.frame_start = now;
    }

    /// When the next frame may start.
    pub fn deadline(&self) -> Instant {
        self.frame_start + self.budget
    }

    /// Time left in the current frame's budget, or None once it is spent.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline()
            .checked_duration_since(now)
            .filter(|remaining| !remaining.is_zero())
    }
}
