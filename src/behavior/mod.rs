//! Sweep-and-hide behavior.
//!
//! The behavior is a small state machine built from two pieces:
//!
//! - A **sweep generator** that moves the sensor servo back and forth
//!   between two bounds in fixed steps.
//! - A **debounce filter** that only reports an object once several
//!   readings in a row agree, so a single noisy echo does not send the
//!   robot running.
//!
//! [`controller::HideController`] ties them to the range sensor, the servo
//! and the drivetrain.
//!
//! # Example
//!
//! ```
//! use skittish::behavior::controller::{HideController, Settings};
//! use skittish::drivetrain::{Differential, MotorSide};
//! use skittish::peripherals::{servo::Servo, sim::{ScriptedRange, SimOutput, SimPwm}};
//! use skittish::time::ManualClock;
//!
//! let (pwm, _) = SimPwm::new();
//! let drivetrain = Differential::new(
//!     MotorSide::new(SimOutput::new().0, SimOutput::new().0),
//!     MotorSide::new(SimOutput::new().0, SimOutput::new().0),
//! );
//! let readings = ScriptedRange::new([Some(50.0), Some(50.0), Some(30.0), Some(30.0)]);
//! let mut controller = HideController::new(
//!     readings,
//!     Servo::new(pwm, 2.5, 12.5),
//!     drivetrain,
//!     ManualClock::new(),
//!     Settings::default(),
//! )?;
//!
//! let fired: Vec<bool> = (0..4).map(|_| controller.step().transition.is_some()).collect();
//! assert_eq!(fired, [false, false, false, true]);
//! # Ok::<(), skittish::error::ConfigError>(())
//! ```

/// Consecutive-reading debounce filter.
pub mod debounce;

/// Triangle-wave sweep generator.
pub mod sweep;

/// The sweep/hide state machine.
///
/// Provides [`HideController`](controller::HideController) and its
/// [`Settings`](controller::Settings).
pub mod controller;
