//! Ultrasonic ranging with a software-timed echo.
//!
//! A reading pulses the trigger line high for about 10 µs, waits for the echo
//! line to rise, and times how long it stays high. The echo width covers the
//! round trip, so
//!
//! ```text
//! distance_cm = width_s * speed_of_sound_cm_per_s / 2
//! ```
//!
//! which is `width_s * 17150` at 34300 cm/s.
//!
//! Both waits are bounded by the echo timeout (25 ms by default, about 4 m of
//! range). A reading that times out returns `None` instead of blocking, which
//! caps how long one loop iteration can take. A timeout is not an error: the
//! controller treats it exactly like an object far away.

use std::time::Duration;

use log::{debug, info, warn};

use super::{Distance, InputLine, OutputLine, RangeSensor};
use crate::time::Clock;

/// Speed of sound in air at room temperature, cm/s.
pub const SPEED_OF_SOUND_CM_S: f64 = 34_300.0;

/// Default bound on each echo wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(25);

/// Default width of the trigger pulse.
pub const DEFAULT_TRIGGER_PULSE: Duration = Duration::from_micros(10);

/// Default number of consecutive missed echoes before the sensor is reported
/// as silent.
pub const DEFAULT_SILENT_AFTER: u32 = 100;

/// Distance covered by an echo pulse of the given width.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use skittish::peripherals::ultrasonic::{distance_from_echo, SPEED_OF_SOUND_CM_S};
///
/// let d = distance_from_echo(Duration::from_millis(1), SPEED_OF_SOUND_CM_S);
/// assert!((d.as_cm() - 17.15).abs() < 1e-9);
/// ```
pub fn distance_from_echo(width: Duration, speed_of_sound_cm_s: f64) -> Distance {
    Distance::from_cm(width.as_secs_f64() * speed_of_sound_cm_s / 2.0)
}

/// Which edge of the echo never arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoStage {
    /// The echo line never went high.
    Rise,
    /// The echo line went high and never came back down.
    Fall,
}

/// An HC-SR04 style sensor on a trigger output and an echo input.
pub struct Ultrasonic<T, E, C> {
    trigger:              T,
    echo:                 E,
    clock:                C,
    timeout:              Duration,
    trigger_pulse:        Duration,
    poll_interval:        Duration,
    speed_of_sound:       f64,
    silent_after:         u32,
    consecutive_timeouts: u32,
    total_timeouts:       u64,
    last_timeout:         Option<EchoStage>,
}

impl<T: OutputLine, E: InputLine, C: Clock> Ultrasonic<T, E, C> {
    /// Creates a sensor with the default timing. The trigger line is driven
    /// low immediately.
    pub fn new(mut trigger: T, echo: E, clock: C) -> Self {
        trigger.set_low();
        Self {
            trigger,
            echo,
            clock,
            timeout: DEFAULT_TIMEOUT,
            trigger_pulse: DEFAULT_TRIGGER_PULSE,
            poll_interval: Duration::ZERO,
            speed_of_sound: SPEED_OF_SOUND_CM_S,
            silent_after: DEFAULT_SILENT_AFTER,
            consecutive_timeouts: 0,
            total_timeouts: 0,
            last_timeout: None,
        }
    }

    /// Sets the bound on each echo wait.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the trigger pulse width.
    pub fn with_trigger_pulse(mut self, pulse: Duration) -> Self {
        self.trigger_pulse = pulse;
        self
    }

    /// Sets the pause between echo polls. Zero busy-polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the speed of sound used for the conversion, in cm/s.
    pub fn with_speed_of_sound(mut self, cm_per_s: f64) -> Self {
        self.speed_of_sound = cm_per_s;
        self
    }

    /// Sets how many consecutive missed echoes are logged as a silent sensor.
    /// Zero disables the warning.
    pub fn with_silent_warning(mut self, after: u32) -> Self {
        self.silent_after = after;
        self
    }

    /// Missed echoes since the last successful reading.
    pub fn consecutive_timeouts(&self) -> u32 { self.consecutive_timeouts }

    /// Missed echoes since the sensor was created.
    pub fn total_timeouts(&self) -> u64 { self.total_timeouts }

    /// Which edge the most recent missed reading was waiting for. Cleared by a
    /// successful reading.
    pub fn last_timeout(&self) -> Option<EchoStage> { self.last_timeout }

    fn pulse_trigger(&mut self) {
        self.trigger.set_low();
        self.clock.sleep(self.trigger_pulse);
        self.trigger.set_high();
        self.clock.sleep(self.trigger_pulse);
        self.trigger.set_low();
    }

    /// Waits while the echo line reads `level`. Returns `false` on timeout.
    fn wait_while(&self, level: bool) -> bool {
        let start = self.clock.now();
        while self.echo.is_high() == level {
            if self.clock.since(start) > self.timeout {
                return false;
            }
            self.clock.sleep(self.poll_interval);
        }
        true
    }

    fn timed_out(&mut self, stage: EchoStage) -> Option<Distance> {
        self.consecutive_timeouts = self.consecutive_timeouts.saturating_add(1);
        self.total_timeouts += 1;
        self.last_timeout = Some(stage);
        debug!("No echo ({:?}), {} in a row", stage, self.consecutive_timeouts);
        if self.silent_after > 0 && self.consecutive_timeouts == self.silent_after {
            warn!("Ultrasonic sensor silent for {} readings", self.consecutive_timeouts);
        }
        None
    }

    fn echo_received(&mut self) {
        if self.silent_after > 0 && self.consecutive_timeouts >= self.silent_after {
            info!("Ultrasonic echo back after {} missed readings", self.consecutive_timeouts);
        }
        self.consecutive_timeouts = 0;
        self.last_timeout = None;
    }
}

impl<T: OutputLine, E: InputLine, C: Clock> RangeSensor for Ultrasonic<T, E, C> {
    fn measure(&mut self) -> Option<Distance> {
        self.pulse_trigger();

        if !self.wait_while(false) {
            return self.timed_out(EchoStage::Rise);
        }
        let rise = self.clock.now();
        if !self.wait_while(true) {
            return self.timed_out(EchoStage::Fall);
        }
        let width = self.clock.since(rise);

        self.echo_received();
        Some(distance_from_echo(width, self.speed_of_sound))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        peripherals::sim::{Echo, UltrasonicBench},
        time::ManualClock,
    };

    fn bench() -> (ManualClock, UltrasonicBench) {
        let clock = ManualClock::new();
        let bench = UltrasonicBench::new(clock.clone());
        (clock, bench)
    }

    #[test]
    fn known_pulse_gives_width_times_17150() {
        let (clock, bench) = bench();
        bench.push(Echo::Pulse {
            delay: Duration::from_micros(300),
            width: Duration::from_micros(1000),
        });
        let (trigger, echo) = bench.lines();
        let mut sensor = Ultrasonic::new(trigger, echo, clock);

        let d = sensor.measure().map(Distance::as_cm);
        assert_relative_eq!(d.unwrap_or(f64::NAN), 0.001 * 17_150.0, epsilon = 1e-6);
        assert_eq!(bench.triggers(), 1);
    }

    #[test]
    fn scripted_distances_round_trip_within_a_microsecond() {
        let (clock, bench) = bench();
        for cm in [5.0, 35.0, 120.0, 380.0] {
            bench.push(Echo::at_cm(cm));
        }
        let (trigger, echo) = bench.lines();
        let mut sensor = Ultrasonic::new(trigger, echo, clock);
        for cm in [5.0, 35.0, 120.0, 380.0] {
            let got = sensor.measure().map(Distance::as_cm).unwrap_or(f64::NAN);
            // one microsecond of polling is 0.017 cm of range
            assert!((got - cm).abs() < 0.02, "expected {cm}, got {got}");
        }
    }

    #[test]
    fn no_rise_returns_none_after_timeout() {
        let (clock, bench) = bench();
        bench.push(Echo::Silent);
        let (trigger, echo) = bench.lines();
        let mut sensor = Ultrasonic::new(trigger, echo, clock.clone());

        let before = clock.now();
        assert_eq!(sensor.measure(), None);
        let spent = clock.since(before);
        assert!(spent > DEFAULT_TIMEOUT);
        assert!(spent < DEFAULT_TIMEOUT + Duration::from_millis(1));
        assert_eq!(sensor.last_timeout(), Some(EchoStage::Rise));
    }

    #[test]
    fn stuck_echo_returns_none() {
        let (clock, bench) = bench();
        bench.push(Echo::Stuck);
        let (trigger, echo) = bench.lines();
        let mut sensor = Ultrasonic::new(trigger, echo, clock);
        assert_eq!(sensor.measure(), None);
        assert_eq!(sensor.last_timeout(), Some(EchoStage::Fall));
    }

    #[test]
    fn timeout_counters_reset_on_echo() {
        let (clock, bench) = bench();
        bench.push(Echo::Silent);
        bench.push(Echo::Silent);
        bench.push(Echo::Stuck);
        bench.push(Echo::at_cm(50.0));
        bench.push(Echo::Silent);
        let (trigger, echo) = bench.lines();
        let mut sensor = Ultrasonic::new(trigger, echo, clock).with_silent_warning(2);

        for _ in 0..3 {
            assert!(sensor.measure().is_none());
        }
        assert_eq!(sensor.consecutive_timeouts(), 3);
        assert!(sensor.measure().is_some());
        assert_eq!(sensor.consecutive_timeouts(), 0);
        assert_eq!(sensor.last_timeout(), None);
        assert!(sensor.measure().is_none());
        assert_eq!(sensor.consecutive_timeouts(), 1);
        assert_eq!(sensor.total_timeouts(), 4);
    }

    #[test]
    fn shorter_timeout_caps_range() {
        let (clock, bench) = bench();
        bench.push(Echo::at_cm(300.0));
        let (trigger, echo) = bench.lines();
        // 300 cm needs ~17.5 ms of echo
        let mut sensor =
            Ultrasonic::new(trigger, echo, clock).with_timeout(Duration::from_millis(10));
        assert_eq!(sensor.measure(), None);
    }
}
