//! Error types for configuration and hardware access.
//!
//! The control loop itself has no fatal error path: a missing echo is a
//! reading, not an error, and device write failures are logged and skipped.
//! These types cover what can go wrong before the loop starts, when the
//! configuration is read and the GPIO lines are claimed.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while claiming or driving hardware lines.
#[derive(Debug, Error)]
pub enum HardwareError {
    /// A GPIO line could not be claimed (already in use, no permission, no
    /// GPIO controller on this machine).
    #[error("GPIO line {line} unavailable: {reason}")]
    Unavailable {
        /// BCM line number.
        line:   u8,
        /// Backend-specific description.
        reason: String,
    },

    /// The PWM signal on a line could not be changed.
    #[error("PWM error on line {line}: {reason}")]
    Pwm {
        /// BCM line number.
        line:   u8,
        /// Backend-specific description.
        reason: String,
    },

    /// The requested duty cycle lies outside `0..=100` percent.
    #[error("duty cycle {0}% out of range")]
    DutyOutOfRange(f64),
}

/// Errors raised while loading or validating a [`Config`](crate::config::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path that was opened.
        path:   PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unknown/mistyped keys.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Sweep bounds are reversed, equal, or outside the servo's 0–180° travel.
    #[error("invalid sweep bounds: min {min}°, max {max}° (need 0 <= min < max <= 180)")]
    SweepBounds {
        /// Lower bound in degrees.
        min: f64,
        /// Upper bound in degrees.
        max: f64,
    },

    /// The sweep step is zero, negative, or wider than the sweep itself.
    #[error("invalid sweep step {step}° for a {span}° sweep")]
    SweepStep {
        /// Step in degrees.
        step: f64,
        /// Width of the sweep in degrees.
        span: f64,
    },

    /// An angle setting lies outside the servo's travel.
    #[error("{name} angle {value}° outside 0..=180")]
    Angle {
        /// Name of the setting.
        name:  &'static str,
        /// Offending value.
        value: f64,
    },

    /// A debounce threshold of zero would fire without any reading.
    #[error("{name} must be at least 1")]
    ZeroThreshold {
        /// Name of the setting.
        name: &'static str,
    },

    /// A distance setting is not a positive finite number.
    #[error("{name} must be a positive distance, got {value} cm")]
    Distance {
        /// Name of the setting.
        name:  &'static str,
        /// Offending value.
        value: f64,
    },

    /// The clear distance is closer than the near distance, so the two
    /// thresholds would overlap.
    #[error("clear distance {clear_cm} cm must not be below near distance {near_cm} cm")]
    Hysteresis {
        /// Distance that counts as near.
        near_cm:  f64,
        /// Distance that counts as clear.
        clear_cm: f64,
    },

    /// A duration setting is negative or not finite.
    #[error("{name} must be a non-negative number of seconds, got {value}")]
    Duration {
        /// Name of the setting.
        name:  &'static str,
        /// Offending value.
        value: f64,
    },

    /// Servo duty range is empty or not a valid percentage.
    #[error("invalid servo duty range {min}%..{max}%")]
    DutyRange {
        /// Duty at 0°.
        min: f64,
        /// Duty at 180°.
        max: f64,
    },

    /// Servo PWM frequency is not positive.
    #[error("servo frequency must be positive, got {0} Hz")]
    Frequency(f64),

    /// Two roles were assigned the same GPIO line.
    #[error("GPIO line {line} assigned to both {first} and {second}")]
    PinConflict {
        /// BCM line number.
        line:   u8,
        /// First role using it.
        first:  &'static str,
        /// Second role using it.
        second: &'static str,
    },
}
