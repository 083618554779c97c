//! Time management utilities

use std::time::{Duration, Instant};

/// Frame pacing statistics for a render loop
///
/// Counts presented and dropped frames separately; a dropped frame is one the
/// backend acquired but could not present.
pub struct FrameTimer {
    started: Instant,
    last_frame: Instant,
    delta: Duration,
    presented: u64,
    dropped: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    /// Create a new timer
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last_frame: now,
            delta: Duration::ZERO,
            presented: 0,
            dropped: 0,
        }
    }

    /// Record the end of a frame (call once per frame)
    pub fn record_frame(&mut self, presented: bool) {
        let now = Instant::now();
        self.delta = now.duration_since(self.last_frame);
        self.last_frame = now;
        if presented {
            self.presented += 1;
        } else {
            self.dropped += 1;
        }
    }

    /// Time between the last two recorded frames
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Number of frames that reached the display
    pub fn presented_frames(&self) -> u64 {
        self.presented
    }

    /// Number of frames that were dropped
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }

    /// Average presented frames per second since the timer was created
    #[allow(clippy::cast_precision_loss)]
    pub fn average_fps(&self) -> f32 {
        let elapsed = self.started.elapsed().as_secs_f32();
        if elapsed > 0.0 {
            self.presented as f32 / elapsed
        } else {
            0.0
        }
    }
}
