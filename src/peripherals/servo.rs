//! Hobby servo on a 50 Hz PWM line.
//!
//! Angles map linearly onto the duty cycle:
//!
//! ```text
//! duty = min_duty + (angle / 180) * (max_duty - min_duty)
//! ```
//!
//! With the default 2.5 %–12.5 % range at 50 Hz (a 20 ms period) this is a
//! 0.5 ms pulse at 0° and a 2.5 ms pulse at 180°.

use std::time::Duration;

use log::warn;

use super::PwmLine;

/// Full travel of the servo in degrees.
pub const MAX_ANGLE: f64 = 180.0;

/// Duty cycle in percent that positions the servo at `angle` degrees.
///
/// `angle` is clamped to `0..=180` first.
///
/// # Example
///
/// ```
/// use skittish::peripherals::servo::angle_to_duty;
///
/// assert_eq!(angle_to_duty(0.0, 2.5, 12.5), 2.5);
/// assert_eq!(angle_to_duty(90.0, 2.5, 12.5), 7.5);
/// assert_eq!(angle_to_duty(180.0, 2.5, 12.5), 12.5);
/// ```
pub fn angle_to_duty(angle: f64, min_duty: f64, max_duty: f64) -> f64 {
    let angle = angle.clamp(0.0, MAX_ANGLE);
    min_duty + (angle / MAX_ANGLE) * (max_duty - min_duty)
}

/// High time of each pulse for `angle` degrees at the given signal period.
pub fn angle_to_pulse_width(
    angle: f64,
    min_duty: f64,
    max_duty: f64,
    period: Duration,
) -> Duration {
    period.mul_f64(angle_to_duty(angle, min_duty, max_duty) / 100.0)
}

/// A positional servo.
pub struct Servo<P> {
    pwm:      P,
    min_duty: f64,
    max_duty: f64,
    angle:    Option<f64>,
    released: bool,
}

impl<P: PwmLine> Servo<P> {
    /// Wraps a PWM line. `min_duty` and `max_duty` are the duty cycles (in
    /// percent) at 0° and 180°.
    pub fn new(pwm: P, min_duty: f64, max_duty: f64) -> Self {
        Self {
            pwm,
            min_duty,
            max_duty,
            angle: None,
            released: false,
        }
    }

    /// Commands the servo to `angle` degrees (clamped to `0..=180`).
    ///
    /// A PWM error is logged and the previous angle is kept.
    pub fn set_angle(&mut self, angle: f64) {
        let angle = angle.clamp(0.0, MAX_ANGLE);
        let duty = angle_to_duty(angle, self.min_duty, self.max_duty);
        match self.pwm.set_duty_cycle(duty) {
            Ok(()) => {
                self.angle = Some(angle);
                self.released = false;
            }
            Err(e) => warn!("Servo Duty Error: {}", e),
        }
    }

    /// The last angle successfully commanded, if any.
    pub fn angle(&self) -> Option<f64> { self.angle }

    /// Stops the PWM signal so the servo goes limp. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.pwm.disable() {
            warn!("Servo Release Error: {}", e);
        }
        self.released = true;
        self.angle = None;
    }

    /// Whether the signal has been released.
    pub fn is_released(&self) -> bool { self.released }
}
