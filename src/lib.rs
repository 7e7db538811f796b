//! # Skittish
//!
//! Skittish drives a small tank-drive robot that sweeps an ultrasonic sensor
//! back and forth on a servo and runs away from anything that comes close.
//! It provides:
//!
//! - **Ranging**: HC-SR04 style ultrasonic readings with a bounded,
//!   software-timed echo wait.
//! - **Sweeping**: a triangle-wave servo sweep between two angles.
//! - **Hiding**: a debounced two-state controller that turns the robot away
//!   when an object is confirmed close, then returns to sweeping.
//! - **Hardware**: traits for GPIO lines with a Raspberry Pi backend (feature
//!   `rpi`) and a simulated backend for tests and dry runs.
//! - **Logging**: a console and file logger for debugging on the robot.
//!
//! ## Quick Start
//!
//! ```
//! use skittish::behavior::controller::{ControllerState, HideController, Settings};
//! use skittish::drivetrain::{Differential, MotorSide};
//! use skittish::peripherals::{servo::Servo, sim::{ScriptedRange, SimOutput, SimPwm}};
//! use skittish::time::ManualClock;
//!
//! let (pwm, _) = SimPwm::new();
//! let side = || MotorSide::new(SimOutput::new().0, SimOutput::new().0);
//! let mut controller = HideController::new(
//!     ScriptedRange::new([Some(50.0), Some(50.0), Some(30.0), Some(30.0)]),
//!     Servo::new(pwm, 2.5, 12.5),
//!     Differential::new(side(), side()),
//!     ManualClock::new(),
//!     Settings::default(),
//! )?;
//!
//! controller.start();
//! for _ in 0..4 {
//!     controller.step();
//! }
//! assert!(matches!(controller.state(), ControllerState::Hiding { .. }));
//! # Ok::<(), skittish::error::ConfigError>(())
//! ```
//!
//! ## Modules
//!
//! - [`behavior`]: Sweep generator, debounce filter and the hide controller.
//! - [`peripherals`]: Line traits, ultrasonic sensor, servo and backends.
//! - [`drivetrain`]: Differential drivetrain on two H-bridge channels.
//! - [`config`]: TOML configuration with validated defaults.
//! - [`time`]: Injectable clock.
//! - [`fs`]: Logging.

/// Sweep, debounce and hide control.
///
/// The [`HideController`](behavior::controller::HideController) owns the
/// sensor, servo and drivetrain and alternates between two states:
///
/// - **Sweeping**: step the servo, take a reading, count near readings.
/// - **Hiding**: point the sensor away, run the evasive maneuver, wait.
pub mod behavior;

/// Configuration file support.
///
/// Loads a [`Config`](config::Config) from TOML and turns it into controller
/// settings, rejecting values the robot cannot use.
pub mod config;

/// Differential drivetrain control module.
///
/// Provides the [`Differential`](drivetrain::Differential) struct for robots
/// with one motor per side on an H-bridge. Supports forward, backward and
/// in-place spins in either direction.
pub mod drivetrain;

/// Error types.
pub mod error;

/// Filesystem utilities module.
///
/// Contains logging functionality for recording robot telemetry and debug
/// information to the console and a log file.
pub mod fs;

/// Hardware abstraction module.
///
/// Digital and PWM line traits, the ultrasonic sensor, the servo driver,
/// and the simulated and Raspberry Pi backends.
pub mod peripherals;

/// Clocks.
pub mod time;
