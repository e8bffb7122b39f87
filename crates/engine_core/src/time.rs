//! Time management for the simulation loop.

use std::time::{Duration, Instant};

/// Largest frame delta handed to the simulation. Longer stalls (debugger, window drag)
/// are clamped so homing and walking physics never take one giant step.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

/// Manages frame timing and delta time calculation.
///
/// Runs either from the wall clock ([`Time::update`]) or from externally supplied
/// steps ([`Time::advance`]) so headless runs and tests are reproducible.
#[derive(Debug)]
pub struct Time {
    /// Time of the last wall-clock frame.
    last_frame: Instant,
    /// Duration of the last frame (after clamping).
    delta: Duration,
    /// Total simulated time since start.
    elapsed: Duration,
    /// Frame count since start.
    frame_count: u64,
    /// Upper bound applied to every delta.
    max_delta: Duration,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    /// Create a new time manager.
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
            max_delta: MAX_FRAME_DELTA,
        }
    }

    /// Update timing from the wall clock at the start of a new frame.
    pub fn update(&mut self) {
        let now = Instant::now();
        let raw = now - self.last_frame;
        self.last_frame = now;
        self.step(raw);
    }

    /// Advance by a fixed simulated step instead of reading the wall clock.
    pub fn advance(&mut self, dt: Duration) {
        self.last_frame = Instant::now();
        self.step(dt);
    }

    fn step(&mut self, raw: Duration) {
        if raw > self.max_delta {
            log::debug!("frame delta {:?} clamped to {:?}", raw, self.max_delta);
        }
        self.delta = raw.min(self.max_delta);
        self.elapsed += self.delta;
        self.frame_count += 1;
    }

    /// Get the delta time in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get the delta time as a Duration.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Get total elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Change the clamp applied to each frame delta.
    pub fn set_max_delta(&mut self, max: Duration) {
        self.max_delta = max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates_elapsed_and_frames() {
        let mut time = Time::new();
        time.advance(Duration::from_millis(20));
        time.advance(Duration::from_millis(30));
        assert_eq!(time.frame_count(), 2);
        assert_eq!(time.delta(), Duration::from_millis(30));
        assert!((time.elapsed_seconds() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn long_stall_is_clamped() {
        let mut time = Time::new();
        time.advance(Duration::from_secs(3));
        assert_eq!(time.delta(), MAX_FRAME_DELTA);
        assert_eq!(time.elapsed_seconds(), MAX_FRAME_DELTA.as_secs_f32());
    }
}
