//! Simulated hardware.
//!
//! Each simulated line comes with a probe sharing its state, so a test can
//! hand the line to the controller and still watch what the controller does
//! with it. Everything here runs on a [`ManualClock`] and never blocks.
//!
//! # Example
//!
//! ```
//! use skittish::peripherals::{RangeSensor, sim::{Echo, UltrasonicBench}, ultrasonic::Ultrasonic};
//! use skittish::time::ManualClock;
//!
//! let clock = ManualClock::new();
//! let bench = UltrasonicBench::new(clock.clone());
//! bench.push(Echo::at_cm(30.0));
//! bench.push(Echo::Silent);
//!
//! let (trigger, echo) = bench.lines();
//! let mut sensor = Ultrasonic::new(trigger, echo, clock);
//! let near = sensor.measure().map(|d| d.as_cm()).unwrap_or_default();
//! assert!((near - 30.0).abs() < 0.1);
//! assert!(sensor.measure().is_none());
//! ```

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
    time::Duration,
};

use super::{Distance, InputLine, OutputLine, PwmLine, RangeSensor};
use crate::{
    error::HardwareError,
    time::{Clock, ManualClock},
};

/// Half the speed of sound in cm/s: centimetres of range per second of echo.
const CM_PER_ECHO_SECOND: f64 = 17_150.0;

/// Delay between the end of the trigger pulse and the echo rising, typical of
/// an HC-SR04 sending its burst.
const ECHO_RISE_DELAY: Duration = Duration::from_micros(200);

/// A recording digital output.
#[derive(Debug)]
pub struct SimOutput {
    probe: LineProbe,
}

/// Read side of a [`SimOutput`].
#[derive(Debug, Clone, Default)]
pub struct LineProbe {
    level:        Rc<Cell<bool>>,
    rising_edges: Rc<Cell<u32>>,
}

impl SimOutput {
    /// Creates a line starting low, with its probe.
    pub fn new() -> (Self, LineProbe) {
        let probe = LineProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl OutputLine for SimOutput {
    fn set_level(&mut self, high: bool) {
        if high && !self.probe.level.get() {
            self.probe.rising_edges.set(self.probe.rising_edges.get() + 1);
        }
        self.probe.level.set(high);
    }
}

impl LineProbe {
    /// Current level of the line.
    pub fn is_high(&self) -> bool { self.level.get() }

    /// How many times the line went from low to high.
    pub fn rising_edges(&self) -> u32 { self.rising_edges.get() }
}

#[derive(Debug, Default)]
struct PwmState {
    duty:        Option<f64>,
    history:     Vec<f64>,
    disables:    u32,
    fail_writes: bool,
}

/// A recording PWM line.
#[derive(Debug)]
pub struct SimPwm {
    state: Rc<RefCell<PwmState>>,
}

/// Read side of a [`SimPwm`].
#[derive(Debug, Clone)]
pub struct PwmProbe {
    state: Rc<RefCell<PwmState>>,
}

impl SimPwm {
    /// Creates a stopped PWM line with its probe.
    pub fn new() -> (Self, PwmProbe) {
        let state = Rc::new(RefCell::new(PwmState::default()));
        (
            Self {
                state: state.clone(),
            },
            PwmProbe { state },
        )
    }
}

impl PwmLine for SimPwm {
    fn set_duty_cycle(&mut self, percent: f64) -> Result<(), HardwareError> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(HardwareError::Pwm {
                line:   0,
                reason: "simulated failure".into(),
            });
        }
        if !(0.0..=100.0).contains(&percent) {
            return Err(HardwareError::DutyOutOfRange(percent));
        }
        state.duty = Some(percent);
        state.history.push(percent);
        Ok(())
    }

    fn disable(&mut self) -> Result<(), HardwareError> {
        let mut state = self.state.borrow_mut();
        state.duty = None;
        state.disables += 1;
        Ok(())
    }
}

impl PwmProbe {
    /// Current duty cycle, or `None` while the signal is stopped.
    pub fn duty(&self) -> Option<f64> { self.state.borrow().duty }

    /// Every duty cycle written, oldest first.
    pub fn history(&self) -> Vec<f64> { self.state.borrow().history.clone() }

    /// How many times the signal was disabled.
    pub fn disable_count(&self) -> u32 { self.state.borrow().disables }

    /// Makes subsequent duty writes fail.
    pub fn fail_writes(&self, fail: bool) { self.state.borrow_mut().fail_writes = fail; }
}

/// One scripted response of the simulated ultrasonic sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Echo {
    /// Echo rises `delay` after the trigger falls and stays high for `width`.
    Pulse {
        /// Time from trigger falling edge to echo rising edge.
        delay: Duration,
        /// Width of the echo pulse.
        width: Duration,
    },
    /// No echo at all.
    Silent,
    /// Echo rises and never falls.
    Stuck,
}

impl Echo {
    /// The echo an object at `cm` centimetres would return.
    pub fn at_cm(cm: f64) -> Self {
        Self::Pulse {
            delay: ECHO_RISE_DELAY,
            width: Duration::from_secs_f64(cm / CM_PER_ECHO_SECOND),
        }
    }
}

#[derive(Debug, Default)]
struct BenchState {
    script:   VecDeque<Echo>,
    cycle:    bool,
    window:   Option<(Duration, Option<Duration>)>,
    triggers: u32,
}

impl BenchState {
    fn next_echo(&mut self) -> Echo {
        let echo = self.script.pop_front().unwrap_or(Echo::Silent);
        if self.cycle {
            self.script.push_back(echo);
        }
        echo
    }
}

/// A simulated HC-SR04: the trigger line arms the next scripted echo on its
/// falling edge, and the echo line reads high during that echo's window.
#[derive(Debug, Clone)]
pub struct UltrasonicBench {
    clock: ManualClock,
    state: Rc<RefCell<BenchState>>,
}

impl UltrasonicBench {
    /// Creates a bench with an empty script. An empty script answers
    /// [`Echo::Silent`].
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            state: Rc::new(RefCell::new(BenchState::default())),
        }
    }

    /// Creates a bench that replays `script` forever.
    pub fn cycling(clock: ManualClock, script: impl IntoIterator<Item = Echo>) -> Self {
        let bench = Self::new(clock);
        {
            let mut state = bench.state.borrow_mut();
            state.script.extend(script);
            state.cycle = true;
        }
        bench
    }

    /// Queues an echo for a later trigger.
    pub fn push(&self, echo: Echo) { self.state.borrow_mut().script.push_back(echo); }

    /// Number of trigger pulses seen so far.
    pub fn triggers(&self) -> u32 { self.state.borrow().triggers }

    /// The trigger and echo lines wired to this bench.
    pub fn lines(&self) -> (SimTrigger, SimEcho) {
        (
            SimTrigger {
                bench: self.clone(),
                high:  false,
            },
            SimEcho {
                bench: self.clone(),
            },
        )
    }
}

/// Trigger line of an [`UltrasonicBench`].
#[derive(Debug)]
pub struct SimTrigger {
    bench: UltrasonicBench,
    high:  bool,
}

impl OutputLine for SimTrigger {
    fn set_level(&mut self, high: bool) {
        if self.high && !high {
            let now = self.bench.clock.now();
            let mut state = self.bench.state.borrow_mut();
            state.triggers += 1;
            state.window = match state.next_echo() {
                Echo::Pulse { delay, width } => Some((now + delay, Some(now + delay + width))),
                Echo::Stuck => Some((now + ECHO_RISE_DELAY, None)),
                Echo::Silent => None,
            };
        }
        self.high = high;
    }
}

/// Echo line of an [`UltrasonicBench`].
#[derive(Debug)]
pub struct SimEcho {
    bench: UltrasonicBench,
}

impl InputLine for SimEcho {
    fn is_high(&self) -> bool {
        let now = self.bench.clock.now();
        match self.bench.state.borrow().window {
            Some((rise, Some(fall))) => rise <= now && now < fall,
            Some((rise, None)) => rise <= now,
            None => false,
        }
    }
}

/// A range sensor that replays readings without any line timing.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRange {
    readings: VecDeque<Option<Distance>>,
    taken:    usize,
}

impl ScriptedRange {
    /// Replays `readings` in centimetres; `None` is a missing echo. Once the
    /// script runs out every reading is `None`.
    pub fn new(readings: impl IntoIterator<Item = Option<f64>>) -> Self {
        Self {
            readings: readings.into_iter().map(|r| r.map(Distance::from_cm)).collect(),
            taken:    0,
        }
    }

    /// Appends more readings.
    pub fn extend(&mut self, readings: impl IntoIterator<Item = Option<f64>>) {
        self.readings.extend(readings.into_iter().map(|r| r.map(Distance::from_cm)));
    }

    /// Number of readings taken so far.
    pub fn taken(&self) -> usize { self.taken }
}

impl RangeSensor for ScriptedRange {
    fn measure(&mut self) -> Option<Distance> {
        self.taken += 1;
        self.readings.pop_front().flatten()
    }
}
