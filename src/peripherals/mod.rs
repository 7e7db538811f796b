//! Hardware abstraction for the robot's GPIO lines.
//!
//! The controller never talks to a GPIO library directly. It drives
//! [`OutputLine`]s, reads [`InputLine`]s, writes duty cycles to a
//! [`PwmLine`] and takes readings from a [`RangeSensor`]. Two backends
//! implement these traits:
//!
//! - [`sim`]: simulated lines that record what was written, plus a scripted
//!   ultrasonic bench. Used by the tests and by `--simulate`.
//! - `rpi` (cargo feature `rpi`): Raspberry Pi GPIO through `rppal`.
//!
//! # Wiring
//!
//! | Role | Direction | Default BCM line |
//! |---|---|---|
//! | Servo signal | PWM out, 50 Hz | 17 |
//! | Ultrasonic trigger | out | 20 |
//! | Ultrasonic echo | in (level-shifted to 3.3 V) | 24 |
//! | Left motor IN1/IN2 | out | 5, 6 |
//! | Right motor IN3/IN4 | out | 13, 19 |

use std::fmt;

use crate::error::HardwareError;

/// Servo driver with angle-to-duty mapping.
pub mod servo;

/// Simulated lines and sensors.
pub mod sim;

/// HC-SR04 style ultrasonic ranging.
pub mod ultrasonic;

/// Raspberry Pi backend.
#[cfg(feature = "rpi")]
pub mod rpi;

/// A digital output line.
pub trait OutputLine {
    /// Drives the line high (`true`) or low (`false`).
    fn set_level(&mut self, high: bool);

    /// Drives the line high.
    fn set_high(&mut self) { self.set_level(true) }

    /// Drives the line low.
    fn set_low(&mut self) { self.set_level(false) }
}

/// A digital input line.
pub trait InputLine {
    /// Whether the line currently reads high.
    fn is_high(&self) -> bool;

    /// Whether the line currently reads low.
    fn is_low(&self) -> bool { !self.is_high() }
}

/// A line carrying a PWM signal at a fixed frequency.
pub trait PwmLine {
    /// Sets the duty cycle in percent (`0.0..=100.0`), starting the signal if
    /// it is not running.
    fn set_duty_cycle(&mut self, percent: f64) -> Result<(), HardwareError>;

    /// Stops the signal and leaves the line low.
    fn disable(&mut self) -> Result<(), HardwareError>;
}

/// Anything that can take one distance reading.
///
/// `None` means no echo came back in time. Callers treat it as "nothing
/// nearby".
pub trait RangeSensor {
    /// Takes one reading.
    fn measure(&mut self) -> Option<Distance>;
}

impl<T: OutputLine + ?Sized> OutputLine for Box<T> {
    fn set_level(&mut self, high: bool) { (**self).set_level(high) }
}

impl<T: PwmLine + ?Sized> PwmLine for Box<T> {
    fn set_duty_cycle(&mut self, percent: f64) -> Result<(), HardwareError> {
        (**self).set_duty_cycle(percent)
    }

    fn disable(&mut self) -> Result<(), HardwareError> { (**self).disable() }
}

impl<T: RangeSensor + ?Sized> RangeSensor for Box<T> {
    fn measure(&mut self) -> Option<Distance> { (**self).measure() }
}

/// A distance in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Distance(f64);

impl Distance {
    /// Creates a distance from centimetres.
    pub const fn from_cm(cm: f64) -> Self { Self(cm) }

    /// The distance in centimetres.
    pub const fn as_cm(self) -> f64 { self.0 }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.1} cm", self.0) }
}
