//! Frame clocks
//!
//! The render loop reads time through the [`Clock`] trait so tests can swap
//! the wall clock for a [`ManualClock`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic source of elapsed time
pub trait Clock {
    /// Seconds elapsed since the clock was started
    fn elapsed_seconds(&self) -> f32;
}

/// Wall clock started when the scene is constructed
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    started: Instant,
}

impl FrameClock {
    /// Start a new clock now
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for FrameClock {
    fn elapsed_seconds(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }
}

/// Hand-driven clock for deterministic tests and headless runs
///
/// Clones share the same reading, so a test can keep one handle while the
/// render loop owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    elapsed: Rc<Cell<f32>>,
}

impl ManualClock {
    /// Create a clock reading zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward; negative steps are ignored
    pub fn advance(&self, seconds: f32) {
        if seconds > 0.0 {
            self.elapsed.set(self.elapsed.get() + seconds);
        }
    }
}

impl Clock for ManualClock {
    fn elapsed_seconds(&self) -> f32 {
        self.elapsed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_frame_clock_is_monotonic() {
        let clock = FrameClock::start();
        let first = clock.elapsed_seconds();
        thread::sleep(Duration::from_millis(5));
        let second = clock.elapsed_seconds();
        assert!(second >= first);
        assert!(second >= 0.004);
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let handle = clock.clone();

        handle.advance(0.5);
        handle.advance(-3.0);

        assert_eq!(clock.elapsed_seconds(), 0.5);
    }
}
