//! End-to-end runs of the hide controller on simulated hardware.

use std::{sync::atomic::AtomicBool, time::Duration};

use skittish::{
    behavior::controller::{
        ControllerState, ExitPolicy, HideController, Maneuver, Settings, Transition,
    },
    config::Config,
    drivetrain::{Differential, Drive, MotorSide},
    peripherals::{
        RangeSensor,
        servo::Servo,
        sim::{Echo, LineProbe, PwmProbe, ScriptedRange, SimOutput, SimPwm, UltrasonicBench},
        ultrasonic::Ultrasonic,
    },
    time::{Clock, ManualClock},
};

struct Motors {
    probes: [LineProbe; 4],
}

impl Motors {
    fn all_low(&self) -> bool { self.probes.iter().all(|p| !p.is_high()) }

    fn edges(&self) -> u32 { self.probes.iter().map(LineProbe::rising_edges).sum() }
}

fn drivetrain() -> (Differential, Motors) {
    let (in1, p1) = SimOutput::new();
    let (in2, p2) = SimOutput::new();
    let (in3, p3) = SimOutput::new();
    let (in4, p4) = SimOutput::new();
    (
        Differential::new(MotorSide::new(in1, in2), MotorSide::new(in3, in4)),
        Motors {
            probes: [p1, p2, p3, p4],
        },
    )
}

fn scripted<S: RangeSensor>(
    sensor: S,
    clock: &ManualClock,
    settings: Settings,
) -> (HideController<S, SimPwm, ManualClock>, PwmProbe, Motors) {
    let (pwm, servo) = SimPwm::new();
    let (drivetrain, motors) = drivetrain();
    let controller =
        HideController::new(sensor, Servo::new(pwm, 2.5, 12.5), drivetrain, clock.clone(), settings)
            .unwrap();
    (controller, servo, motors)
}

fn readings(cm: &[f64]) -> ScriptedRange { ScriptedRange::new(cm.iter().map(|&cm| Some(cm))) }

#[test]
fn hides_after_second_consecutive_near_reading() {
    let clock = ManualClock::new();
    let sensor = readings(&[50.0, 50.0, 30.0, 30.0]);
    let (mut controller, servo, _) = scripted(sensor, &clock, Settings::default());

    let transitions: Vec<_> = (0..4).map(|_| controller.step().transition).collect();

    assert!(transitions[..3].iter().all(Option::is_none));
    assert!(matches!(
        transitions[3],
        Some(Transition::HideStarted { distance }) if distance.as_cm() == 30.0
    ));
    assert!(matches!(controller.state(), ControllerState::Hiding { .. }));
    assert_eq!(servo.duty(), Some(12.5));
}

#[test]
fn dwell_ends_on_the_hundredth_poll_and_not_before() {
    let clock = ManualClock::new();
    let mut sensor = readings(&[30.0, 30.0]);
    sensor.extend(std::iter::repeat_n(None, 200));
    let (mut controller, _, motors) = scripted(sensor, &clock, Settings::default());

    controller.step();
    controller.step();
    assert!(matches!(controller.state(), ControllerState::Hiding { .. }));

    for tick in 0..100 {
        let step = controller.step();
        assert_eq!(step.transition, None, "left hiding early at tick {}", tick);
    }
    let step = controller.step();
    assert_eq!(step.transition, Some(Transition::HideEnded {
        hidden_for: Duration::from_secs(5),
    }));
    assert_eq!(controller.state(), ControllerState::Sweeping);
    assert!(motors.all_low());
}

#[test]
fn sweep_reaches_upper_bound_on_twentieth_step_and_turns() {
    let clock = ManualClock::new();
    let sensor = ScriptedRange::new(std::iter::repeat_n(None, 25));
    let (mut controller, _, _) = scripted(sensor, &clock, Settings::default());

    let angles: Vec<f64> = (0..22).map(|_| controller.step().command.servo_angle).collect();

    assert_eq!(angles[0], 40.0);
    assert_eq!(angles[19], 78.0);
    assert_eq!(angles[20], 80.0);
    assert_eq!(angles[21], 78.0);
    assert!(angles.iter().all(|a| (40.0..=80.0).contains(a)));
}

#[test]
fn near_readings_while_hiding_change_nothing() {
    let clock = ManualClock::new();
    let (mut controller, _, motors) = scripted(readings(&[10.0; 40]), &clock, Settings::default());

    controller.step();
    controller.step();
    let edges = motors.edges();
    let since = match controller.state() {
        ControllerState::Hiding { since } => since,
        other => panic!("expected hiding, got {:?}", other),
    };

    for _ in 0..30 {
        let step = controller.step();
        assert_eq!(step.transition, None);
        assert_eq!(step.command.drive, Drive::Stop);
    }
    assert_eq!(controller.state(), ControllerState::Hiding { since });
    assert_eq!(controller.detections(), 1);
    assert_eq!(motors.edges(), edges);
}

#[test]
fn missing_echoes_never_trigger_hiding() {
    let clock = ManualClock::new();
    let sensor = ScriptedRange::new(std::iter::repeat_n(None, 100));
    let (mut controller, _, motors) = scripted(sensor, &clock, Settings::default());

    for _ in 0..100 {
        controller.step();
    }
    assert_eq!(controller.state(), ControllerState::Sweeping);
    assert_eq!(motors.edges(), 0);
}

#[test]
fn clearance_exit_waits_for_far_readings() {
    let settings = Settings {
        maneuver: Maneuver::Reverse {
            back: Duration::from_millis(500),
        },
        exit: ExitPolicy::Clearance {
            clear_cm:   45.0,
            clear_hits: 3,
        },
        ..Settings::default()
    };
    let clock = ManualClock::new();
    let sensor = readings(&[20.0, 20.0, 20.0, 60.0, 60.0, 40.0, 60.0, 60.0, 60.0]);
    let (mut controller, _, _) = scripted(sensor, &clock, settings);

    let transitions: Vec<_> = (0..9).map(|_| controller.step().transition).collect();

    assert!(matches!(transitions[1], Some(Transition::HideStarted { .. })));
    assert!(transitions[2..8].iter().all(Option::is_none));
    assert!(matches!(transitions[8], Some(Transition::HideEnded { .. })));
}

#[test]
fn ultrasonic_bench_drives_a_detection() {
    let clock = ManualClock::new();
    let bench = UltrasonicBench::new(clock.clone());
    for cm in [50.0, 50.0, 30.0, 30.0] {
        bench.push(Echo::at_cm(cm));
    }
    let (trigger, echo) = bench.lines();
    let sensor = Ultrasonic::new(trigger, echo, clock.clone());
    let (mut controller, _, _) = scripted(sensor, &clock, Settings::default());

    let fired: Vec<bool> = (0..4).map(|_| controller.step().transition.is_some()).collect();

    assert_eq!(fired, vec![false, false, false, true]);
    assert_eq!(bench.triggers(), 4);
}

#[test]
fn silent_sensor_reading_costs_one_timeout() {
    let clock = ManualClock::new();
    let bench = UltrasonicBench::new(clock.clone());
    let (trigger, echo) = bench.lines();
    let mut sensor = Ultrasonic::new(trigger, echo, clock.clone());

    let before = clock.now();
    assert!(sensor.measure().is_none());
    let spent = clock.since(before);
    assert!(spent >= Duration::from_millis(25));
    assert!(spent < Duration::from_millis(26));
}

#[test]
fn run_from_config_shuts_down_afterwards() {
    let config = Config::from_toml_str(
        r#"
        [detect]
        near_hits = 3

        [hide.exit]
        kind = "dwell"
        hide_s = 1.0
        "#,
    )
    .unwrap();
    let settings = config.settings().unwrap();
    let clock = ManualClock::new();
    let (mut controller, servo, motors) = scripted(readings(&[20.0; 100]), &clock, settings);

    let summary = controller.run(&AtomicBool::new(true), Some(50));

    assert_eq!(summary.steps, 50);
    assert_eq!(summary.detections, 2);
    assert!(controller.is_shut_down());
    assert_eq!(servo.disable_count(), 1);
    assert!(motors.all_low());
}
