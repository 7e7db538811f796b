//! The sweep/hide state machine.
//!
//! # States
//!
//! | State | On entry | Leaves when | On exit |
//! |---|---|---|---|
//! | `Sweeping` | sweep from the lower bound, heading up | `near_hits` readings in a row at or under `near_cm` | servo to the hide angle, settle, evasive maneuver |
//! | `Hiding` | motors stopped, dwell clock started | the [`ExitPolicy`] fires | motors stopped, return maneuver, servo to neutral, settle |
//!
//! Every call to [`HideController::step`] takes exactly one distance
//! reading, feeds it to the active state, and records the actuator command
//! for that iteration. While sweeping the servo moves one step per
//! iteration; while hiding the loop idles on a coarser poll.
//!
//! Readings taken while hiding never restart the maneuver or the dwell
//! timer.
//!
//! # Shutdown
//!
//! [`HideController::shutdown`] stops both motors and releases the servo
//! signal. It runs at the end of [`HideController::run`] and again from
//! `Drop`, so the actuators are left safe on every way out of the loop,
//! including a panic unwinding through it.

use std::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use log::{debug, info};

use super::{debounce::Debounce, sweep::Sweep};
use crate::{
    drivetrain::{Differential, Drive},
    error::ConfigError,
    peripherals::{Distance, PwmLine, RangeSensor, servo::Servo},
    time::Clock,
};

/// Direction of the evasive spin; the return turn spins the other way.
const EVADE_SPIN: Drive = Drive::SpinCcw;

/// The evasive maneuver run when an object is detected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Maneuver {
    /// Drive backward for `back`, then stop.
    Reverse {
        /// How long to reverse.
        back: Duration,
    },
    /// Optionally reverse for `back`, then spin counter-clockwise in place for
    /// `turn`. With `return_turn` the robot spins clockwise for `turn` when it
    /// stops hiding, to face its original heading again.
    Spin {
        /// How long to reverse before spinning. Zero skips the reverse.
        back:        Duration,
        /// How long to spin; roughly half a turn.
        turn:        Duration,
        /// Spin back when hiding ends.
        return_turn: bool,
    },
}

impl Maneuver {
    /// Runs the maneuver and returns its main drive command. Motors are
    /// stopped when this returns.
    fn evade(&self, drivetrain: &mut Differential, clock: &impl Clock) -> Drive {
        match *self {
            Maneuver::Reverse { back } => {
                drivetrain.run_for(Drive::Backward, back, clock);
                Drive::Backward
            }
            Maneuver::Spin { back, turn, .. } => {
                drivetrain.run_for(Drive::Backward, back, clock);
                drivetrain.run_for(EVADE_SPIN, turn, clock);
                EVADE_SPIN
            }
        }
    }

    /// Runs the return half, if any, and returns its drive command.
    fn recover(&self, drivetrain: &mut Differential, clock: &impl Clock) -> Drive {
        match *self {
            Maneuver::Spin {
                turn,
                return_turn: true,
                ..
            } => {
                let spin = EVADE_SPIN.reversed_spin();
                drivetrain.run_for(spin, turn, clock);
                spin
            }
            _ => Drive::Stop,
        }
    }
}

impl fmt::Display for Maneuver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Maneuver::Reverse { back } => write!(f, "reverse {:?}", back),
            Maneuver::Spin {
                back,
                turn,
                return_turn,
            } => {
                if !back.is_zero() {
                    write!(f, "reverse {:?}, ", back)?;
                }
                write!(f, "spin ccw {:?}", turn)?;
                if *return_turn {
                    write!(f, " (spin back on exit)")?;
                }
                Ok(())
            }
        }
    }
}

/// When the robot stops hiding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitPolicy {
    /// Hide for a fixed time regardless of what the sensor sees.
    Dwell {
        /// How long to hide.
        hide_for: Duration,
    },
    /// Hide until `clear_hits` readings in a row are at or beyond `clear_cm`.
    /// A missing echo counts as clear.
    Clearance {
        /// Distance that counts as clear. At least the near distance.
        clear_cm:   f64,
        /// Consecutive clear readings needed.
        clear_hits: u32,
    },
}

impl fmt::Display for ExitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitPolicy::Dwell { hide_for } => write!(f, "for {:?}", hide_for),
            ExitPolicy::Clearance {
                clear_cm,
                clear_hits,
            } => write!(f, "until {} readings beyond {} cm", clear_hits, clear_cm),
        }
    }
}

/// Timing, thresholds and behavior of a [`HideController`].
///
/// The defaults are the values the robot was tuned with.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub sweep_min:      f64,
    pub sweep_max:      f64,
    pub step_deg:       f64,
    pub step_delay:     Duration,
    pub near_cm:        f64,
    pub near_hits:      u32,
    pub hide_angle:     f64,
    pub neutral_angle:  f64,
    /// Wait after a large servo move before trusting the next reading.
    pub settle:         Duration,
    pub startup_settle: Duration,
    pub hide_poll:      Duration,
    pub maneuver:       Maneuver,
    pub exit:           ExitPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sweep_min:      40.0,
            sweep_max:      80.0,
            step_deg:       2.0,
            step_delay:     Duration::from_millis(30),
            near_cm:        35.0,
            near_hits:      2,
            hide_angle:     180.0,
            neutral_angle:  60.0,
            settle:         Duration::from_millis(100),
            startup_settle: Duration::from_millis(300),
            hide_poll:      Duration::from_millis(50),
            maneuver:       Maneuver::Spin {
                back:        Duration::ZERO,
                turn:        Duration::from_millis(700),
                return_turn: true,
            },
            exit:           ExitPolicy::Dwell {
                hide_for: Duration::from_secs(5),
            },
        }
    }
}

/// Which state the controller is in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerState {
    /// Sweeping the sensor and watching for objects.
    Sweeping,
    /// Hiding since the given clock time.
    Hiding {
        /// Clock reading when the maneuver finished.
        since: Duration,
    },
}

/// A state change that happened during a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// An object was confirmed and the robot started hiding.
    HideStarted {
        /// The reading that confirmed the object.
        distance: Distance,
    },
    /// The robot finished hiding and went back to sweeping.
    HideEnded {
        /// Time spent in the hiding state.
        hidden_for: Duration,
    },
}

/// What the actuators were told during one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorCommand {
    /// Servo angle in degrees.
    pub servo_angle: f64,
    /// Drive command applied during the step. Motors are always stopped again
    /// by the end of a step.
    pub drive:       Drive,
}

/// Record of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// The reading taken, `None` for no echo.
    pub sample:     Option<Distance>,
    /// State after the step.
    pub state:      ControllerState,
    /// State change during the step, if any.
    pub transition: Option<Transition>,
    /// Actuator command for the step.
    pub command:    ActuatorCommand,
}

/// Totals for a finished [`HideController::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Loop iterations executed.
    pub steps:      u64,
    /// Times the robot started hiding.
    pub detections: u64,
}

/// The sweep/hide controller.
///
/// Owns the range sensor, the servo and the drivetrain, and drives them from
/// one loop.
pub struct HideController<S: RangeSensor, P: PwmLine, C: Clock> {
    sensor:     S,
    servo:      Servo<P>,
    drivetrain: Differential,
    clock:      C,
    settings:   Settings,
    sweep:      Sweep,
    near:       Debounce,
    clear:      Debounce,
    state:      ControllerState,
    command:    ActuatorCommand,
    detections: u64,
    shut_down:  bool,
}

impl<S: RangeSensor, P: PwmLine, C: Clock> HideController<S, P, C> {
    /// Creates a controller in the `Sweeping` state at the lower sweep bound.
    ///
    /// Nothing moves until [`start`](Self::start) or [`step`](Self::step).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the sweep bounds or step are invalid.
    pub fn new(
        sensor: S,
        servo: Servo<P>,
        drivetrain: Differential,
        clock: C,
        settings: Settings,
    ) -> Result<Self, ConfigError> {
        let sweep = Sweep::new(settings.sweep_min, settings.sweep_max, settings.step_deg)?;
        let clear_hits = match settings.exit {
            ExitPolicy::Clearance { clear_hits, .. } => clear_hits,
            ExitPolicy::Dwell { .. } => 1,
        };
        Ok(Self {
            sensor,
            servo,
            drivetrain,
            clock,
            near: Debounce::new(settings.near_hits),
            clear: Debounce::new(clear_hits),
            command: ActuatorCommand {
                servo_angle: settings.neutral_angle,
                drive:       Drive::Stop,
            },
            settings,
            sweep,
            state: ControllerState::Sweeping,
            detections: 0,
            shut_down: false,
        })
    }

    /// Stops the motors, points the servo at its neutral angle and waits for
    /// it to get there.
    pub fn start(&mut self) {
        self.shut_down = false;
        self.drivetrain.stop();
        self.servo.set_angle(self.settings.neutral_angle);
        self.clock.sleep(self.settings.startup_settle);
        info!(
            "Sweeping {}°..{}°, hiding on {} readings under {} cm ({}), hide {}",
            self.settings.sweep_min,
            self.settings.sweep_max,
            self.settings.near_hits,
            self.settings.near_cm,
            self.settings.maneuver,
            self.settings.exit
        );
    }

    /// Runs one loop iteration: one reading, one state update, one actuator
    /// command.
    pub fn step(&mut self) -> Step {
        let sample = self.sensor.measure();
        let transition = match self.state {
            ControllerState::Sweeping => self.sweep_step(sample),
            ControllerState::Hiding { since } => self.hide_step(sample, since),
        };
        Step {
            sample,
            state: self.state,
            transition,
            command: self.command,
        }
    }

    fn sweep_step(&mut self, sample: Option<Distance>) -> Option<Transition> {
        let near_cm = self.settings.near_cm;
        let fired = self.near.observe(sample, |d| d.is_some_and(|d| d.as_cm() <= near_cm));
        if let (true, Some(distance)) = (fired, sample) {
            return Some(self.begin_hiding(distance));
        }

        let angle = self.sweep.position();
        self.servo.set_angle(angle);
        self.command = ActuatorCommand {
            servo_angle: angle,
            drive:       Drive::Stop,
        };
        self.clock.sleep(self.settings.step_delay);
        self.sweep.advance();
        None
    }

    fn begin_hiding(&mut self, distance: Distance) -> Transition {
        info!("Object detected at {}: {}", distance, self.settings.maneuver);
        self.servo.set_angle(self.settings.hide_angle);
        self.clock.sleep(self.settings.settle);

        let drive = self.settings.maneuver.evade(&mut self.drivetrain, &self.clock);
        self.drivetrain.stop();

        self.state = ControllerState::Hiding {
            since: self.clock.now(),
        };
        self.clear.reset();
        self.detections += 1;
        self.command = ActuatorCommand {
            servo_angle: self.settings.hide_angle,
            drive,
        };
        info!("Hiding {}", self.settings.exit);
        Transition::HideStarted { distance }
    }

    fn hide_step(&mut self, sample: Option<Distance>, since: Duration) -> Option<Transition> {
        let done = match self.settings.exit {
            ExitPolicy::Dwell { hide_for } => self.clock.since(since) >= hide_for,
            ExitPolicy::Clearance { clear_cm, .. } => {
                self.clear.observe(sample, |d| d.is_none_or(|d| d.as_cm() >= clear_cm))
            }
        };
        if done {
            return Some(self.end_hiding(since));
        }

        if let Some(d) = sample {
            debug!("Hiding, object at {}", d);
        }
        self.command = ActuatorCommand {
            servo_angle: self.settings.hide_angle,
            drive:       Drive::Stop,
        };
        self.clock.sleep(self.settings.hide_poll);
        None
    }

    fn end_hiding(&mut self, since: Duration) -> Transition {
        let hidden_for = self.clock.since(since);
        info!("Done hiding after {:.2?}, resuming sweep", hidden_for);

        self.drivetrain.stop();
        let drive = self.settings.maneuver.recover(&mut self.drivetrain, &self.clock);
        self.servo.set_angle(self.settings.neutral_angle);
        self.clock.sleep(self.settings.settle);

        self.state = ControllerState::Sweeping;
        self.near.reset();
        self.sweep.reset();
        self.command = ActuatorCommand {
            servo_angle: self.settings.neutral_angle,
            drive,
        };
        Transition::HideEnded { hidden_for }
    }

    /// Runs the loop until `running` is cleared (or `max_steps` iterations
    /// have run), then shuts the actuators down.
    ///
    /// The flag is checked once per iteration, so an interrupt takes effect
    /// after at most one reading plus the current state's delays.
    pub fn run(&mut self, running: &AtomicBool, max_steps: Option<u64>) -> RunSummary {
        self.start();
        let detections_before = self.detections;
        let mut steps = 0;
        while running.load(Ordering::SeqCst) && max_steps.is_none_or(|max| steps < max) {
            self.step();
            steps += 1;
        }
        self.shutdown();
        RunSummary {
            steps,
            detections: self.detections - detections_before,
        }
    }

    /// Stops the motors and releases the servo. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.drivetrain.stop();
        self.servo.release();
        self.shut_down = true;
        info!("Motors stopped, servo released");
    }

    /// The current state.
    pub fn state(&self) -> ControllerState { self.state }

    /// The sweep generator.
    pub fn sweep(&self) -> &Sweep { &self.sweep }

    /// Length of the current near streak.
    pub fn near_count(&self) -> u32 { self.near.count() }

    /// Times the robot has started hiding.
    pub fn detections(&self) -> u64 { self.detections }

    /// The range sensor, for diagnostics.
    pub fn sensor(&self) -> &S { &self.sensor }

    /// The servo.
    pub fn servo(&self) -> &Servo<P> { &self.servo }

    /// The drivetrain.
    pub fn drivetrain(&self) -> &Differential { &self.drivetrain }

    /// The settings in use.
    pub fn settings(&self) -> &Settings { &self.settings }

    /// Whether the actuators have been shut down.
    pub fn is_shut_down(&self) -> bool { self.shut_down }
}

impl<S: RangeSensor, P: PwmLine, C: Clock> Drop for HideController<S, P, C> {
    fn drop(&mut self) { self.shutdown(); }
}
