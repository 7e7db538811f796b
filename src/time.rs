//! Clocks for the control loop.
//!
//! Every delay and every elapsed-time check in this crate goes through a
//! [`Clock`], so the same controller code runs against wall time on the robot
//! and against simulated time in tests.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use skittish::time::{Clock, ManualClock};
//!
//! let clock = ManualClock::new();
//! let probe = clock.clone();
//! clock.sleep(Duration::from_millis(50));
//! assert_eq!(probe.now(), Duration::from_millis(50));
//! ```

use std::{
    cell::Cell,
    rc::Rc,
    thread,
    time::{Duration, Instant},
};

/// A source of monotonic time that can also wait.
pub trait Clock {
    /// Time elapsed since this clock's epoch.
    fn now(&self) -> Duration;

    /// Blocks for `duration`.
    fn sleep(&self, duration: Duration);

    /// Time elapsed since an earlier reading of [`Clock::now`].
    fn since(&self, earlier: Duration) -> Duration { self.now().saturating_sub(earlier) }
}

/// Wall-clock time backed by [`Instant`].
///
/// The epoch is the moment the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    /// Creates a clock whose epoch is now.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self { Self::new() }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration { self.epoch.elapsed() }

    fn sleep(&self, duration: Duration) {
        // A zero wait is a busy-poll step (echo timing), not a yield.
        if duration.is_zero() {
            std::hint::spin_loop();
        } else {
            thread::sleep(duration);
        }
    }
}

/// Simulated time, shared between clones.
///
/// `sleep` advances the shared time instead of blocking. Each sleep advances
/// by at least the clock's resolution, so a polling loop that sleeps for zero
/// still moves time forward and eventually times out.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now:        Rc<Cell<Duration>>,
    resolution: Duration,
}

impl ManualClock {
    /// Default resolution: one microsecond.
    pub const DEFAULT_RESOLUTION: Duration = Duration::from_micros(1);

    /// Creates a clock at time zero with the default resolution.
    pub fn new() -> Self { Self::with_resolution(Self::DEFAULT_RESOLUTION) }

    /// Creates a clock at time zero that advances at least `resolution` per
    /// sleep.
    pub fn with_resolution(resolution: Duration) -> Self {
        Self {
            now: Rc::new(Cell::new(Duration::ZERO)),
            resolution,
        }
    }

    /// Moves time forward by exactly `duration`.
    pub fn advance(&self, duration: Duration) { self.now.set(self.now.get() + duration); }

    /// The smallest step a sleep will take.
    pub fn resolution(&self) -> Duration { self.resolution }
}

impl Default for ManualClock {
    fn default() -> Self { Self::new() }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration { self.now.get() }

    fn sleep(&self, duration: Duration) { self.advance(duration.max(self.resolution)); }
}
