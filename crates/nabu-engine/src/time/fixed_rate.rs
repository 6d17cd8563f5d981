use std::time::Instant;

/// Frames within this fraction of a whole frame round up, so an elapsed time
/// of exactly `n / fps` yields `n` despite float accumulation error.
const FRAME_EPSILON: f64 = 1e-6;

/// Fixed-rate timing policy.
///
/// A zero for `min_frames`, `max_frames` or `reset_frames` disables that rule.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FixedRateConfig {
    pub fps: f64,
    /// Fewer due frames than this report 0 and keep the accumulated time.
    pub min_frames: u32,
    /// Most frames returned per call; any further backlog is dropped.
    pub max_frames: u32,
    /// More due frames than this is treated as a stall: report 1, drop the backlog.
    pub reset_frames: u32,
}

impl Default for FixedRateConfig {
    fn default() -> Self {
        Self {
            fps: 60.0,
            min_frames: 1,
            max_frames: 4,
            reset_frames: 16,
        }
    }
}

impl FixedRateConfig {
    #[inline]
    pub fn with_fps(fps: f64) -> Self {
        Self { fps, ..Self::default() }
    }
}

/// Converts elapsed wall-clock time into a whole number of logical frames.
///
/// Each query accumulates the time since the previous one and applies, in order:
/// stall reset, catch-up clamp, minimum threshold, otherwise consume the due
/// frames and keep the sub-frame remainder.
#[derive(Debug, Clone)]
pub struct FixedRateTimer {
    config: FixedRateConfig,
    last: Instant,
    accumulated: f64,
}

impl Default for FixedRateTimer {
    fn default() -> Self {
        Self::new(FixedRateConfig::default())
    }
}

impl FixedRateTimer {
    pub fn new(config: FixedRateConfig) -> Self {
        Self {
            config,
            last: Instant::now(),
            accumulated: 0.0,
        }
    }

    #[inline]
    pub fn config(&self) -> &FixedRateConfig {
        &self.config
    }

    #[inline]
    pub fn fps(&self) -> f64 {
        self.config.fps
    }

    /// Seconds per logical frame.
    #[inline]
    pub fn delta(&self) -> f64 {
        1.0 / self.config.fps
    }

    #[inline]
    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    /// Replaces the policy and resets the accumulator.
    pub fn set_fps(&mut self, config: FixedRateConfig) {
        debug_assert!(config.fps > 0.0, "fps must be positive");
        self.config = config;
        self.reset();
    }

    /// Restarts timing from now with an empty accumulator.
    pub fn reset(&mut self) {
        self.last = Instant::now();
        self.accumulated = 0.0;
    }

    /// Frames due since the previous call, measured with the monotonic clock.
    pub fn get_frames_due(&mut self) -> u32 {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        self.frames_due_after(elapsed)
    }

    /// Frames due after `elapsed` more seconds.
    pub fn frames_due_after(&mut self, elapsed: f64) -> u32 {
        let FixedRateConfig { fps, min_frames, max_frames, reset_frames } = self.config;
        self.accumulated += elapsed.max(0.0);

        let due = (self.accumulated * fps + FRAME_EPSILON).floor().max(0.0);
        let due = if due >= u32::MAX as f64 { u32::MAX } else { due as u32 };

        if reset_frames > 0 && due > reset_frames {
            log::debug!("timer stall: {due} frames due, resetting");
            self.accumulated = 0.0;
            1
        } else if max_frames > 0 && due > max_frames {
            self.accumulated = 0.0;
            max_frames
        } else if min_frames > 0 && due < min_frames {
            0
        } else {
            self.accumulated = (self.accumulated - f64::from(due) / fps).max(0.0);
            due
        }
    }
}
