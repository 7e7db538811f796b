//! Differential drivetrain on two H-bridge channels.
//!
//! This module provides the `Differential` struct for a robot with one DC
//! motor (or motor group) per side, each wired to a pair of H-bridge inputs
//! (IN1/IN2 on the left, IN3/IN4 on the right). Each side is either driven
//! forward, driven backward, or stopped; there is no speed control.
//!
//! # Drive Commands
//!
//! - **Forward / Backward**: both sides in the same direction.
//! - **Spin CCW**: left forward, right backward. Turns in place
//!   counter-clockwise seen from above.
//! - **Spin CW**: left backward, right forward.
//! - **Stop**: all four inputs low.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use skittish::drivetrain::{Differential, Drive, MotorSide};
//! use skittish::peripherals::sim::SimOutput;
//! use skittish::time::ManualClock;
//!
//! let (in1, _) = SimOutput::new();
//! let (in2, _) = SimOutput::new();
//! let (in3, _) = SimOutput::new();
//! let (in4, _) = SimOutput::new();
//! let mut drivetrain = Differential::new(MotorSide::new(in1, in2), MotorSide::new(in3, in4));
//!
//! let clock = ManualClock::new();
//! drivetrain.run_for(Drive::SpinCcw, Duration::from_millis(700), &clock);
//! assert_eq!(drivetrain.current(), Drive::Stop);
//! ```

use std::{fmt, time::Duration};

use log::debug;

use crate::{peripherals::OutputLine, time::Clock};

/// What one side of the drivetrain is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideDirection {
    /// IN1 high, IN2 low.
    Forward,
    /// IN1 low, IN2 high.
    Backward,
    /// Both inputs low.
    Stopped,
}

impl SideDirection {
    /// Levels of the (IN1, IN2) pair for this direction.
    pub fn levels(self) -> (bool, bool) {
        match self {
            SideDirection::Forward => (true, false),
            SideDirection::Backward => (false, true),
            SideDirection::Stopped => (false, false),
        }
    }
}

/// A whole-robot drive command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drive {
    /// Both sides stopped.
    Stop,
    /// Both sides forward.
    Forward,
    /// Both sides backward.
    Backward,
    /// Left forward, right backward: spin counter-clockwise in place.
    SpinCcw,
    /// Left backward, right forward: spin clockwise in place.
    SpinCw,
}

impl Drive {
    /// The (left, right) direction pair for this command.
    pub fn sides(self) -> (SideDirection, SideDirection) {
        use SideDirection::*;
        match self {
            Drive::Stop => (Stopped, Stopped),
            Drive::Forward => (Forward, Forward),
            Drive::Backward => (Backward, Backward),
            Drive::SpinCcw => (Forward, Backward),
            Drive::SpinCw => (Backward, Forward),
        }
    }

    /// The command for a (left, right) direction pair, if it is one of the
    /// named commands.
    pub fn from_sides(left: SideDirection, right: SideDirection) -> Option<Self> {
        [Drive::Stop, Drive::Forward, Drive::Backward, Drive::SpinCcw, Drive::SpinCw]
            .into_iter()
            .find(|d| d.sides() == (left, right))
    }

    /// The command that undoes a spin; other commands map to themselves.
    pub fn reversed_spin(self) -> Self {
        match self {
            Drive::SpinCcw => Drive::SpinCw,
            Drive::SpinCw => Drive::SpinCcw,
            other => other,
        }
    }
}

impl fmt::Display for Drive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Drive::Stop => "stop",
            Drive::Forward => "forward",
            Drive::Backward => "backward",
            Drive::SpinCcw => "spin ccw",
            Drive::SpinCw => "spin cw",
        };
        f.write_str(name)
    }
}

/// One side of the drivetrain: an H-bridge input pair.
pub struct MotorSide {
    in1:       Box<dyn OutputLine>,
    in2:       Box<dyn OutputLine>,
    direction: SideDirection,
}

impl MotorSide {
    /// Wraps an input pair and drives both inputs low.
    pub fn new(in1: impl OutputLine + 'static, in2: impl OutputLine + 'static) -> Self {
        let mut side = Self {
            in1:       Box::new(in1),
            in2:       Box::new(in2),
            direction: SideDirection::Stopped,
        };
        side.set(SideDirection::Stopped);
        side
    }

    /// Drives this side in `direction`.
    ///
    /// The input that is going low is written first, so both inputs are never
    /// high together.
    pub fn set(&mut self, direction: SideDirection) {
        let (a, b) = direction.levels();
        if a {
            self.in2.set_level(b);
            self.in1.set_level(a);
        } else {
            self.in1.set_level(a);
            self.in2.set_level(b);
        }
        self.direction = direction;
    }

    /// The direction last commanded.
    pub fn direction(&self) -> SideDirection { self.direction }
}

/// A differential (tank) drivetrain.
///
/// Both sides start stopped. Every method that moves the robot for a fixed
/// time stops the motors before returning.
pub struct Differential {
    left:  MotorSide,
    right: MotorSide,
}

impl Differential {
    /// Creates a drivetrain from its left and right sides.
    pub fn new(left: MotorSide, right: MotorSide) -> Self {
        let mut drivetrain = Self { left, right };
        drivetrain.stop();
        drivetrain
    }

    /// Applies a drive command and leaves it running.
    pub fn drive(&mut self, drive: Drive) {
        let (left, right) = drive.sides();
        self.left.set(left);
        self.right.set(right);
        debug!("Drive: {}", drive);
    }

    /// Stops both sides.
    pub fn stop(&mut self) {
        self.left.set(SideDirection::Stopped);
        self.right.set(SideDirection::Stopped);
    }

    /// Applies `drive` for `duration`, then stops.
    ///
    /// A zero duration does nothing.
    pub fn run_for(&mut self, drive: Drive, duration: Duration, clock: &impl Clock) {
        if duration.is_zero() || drive == Drive::Stop {
            return;
        }
        self.drive(drive);
        clock.sleep(duration);
        self.stop();
    }

    /// The (left, right) directions currently commanded.
    pub fn sides(&self) -> (SideDirection, SideDirection) {
        (self.left.direction(), self.right.direction())
    }

    /// The current command, or [`Drive::Stop`] for a pair that is not a named
    /// command (one side stopped, the other moving).
    pub fn current(&self) -> Drive {
        let (left, right) = self.sides();
        Drive::from_sides(left, right).unwrap_or(Drive::Stop)
    }
}
