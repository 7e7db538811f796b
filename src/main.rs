use std::{
    path::PathBuf,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::{Context, Result};
use clap::Parser;
use humantime::format_duration;
use log::{LevelFilter, error, info};
use skittish::{
    behavior::controller::{HideController, RunSummary},
    config::Config,
    drivetrain::{Differential, MotorSide},
    fs::logger,
    peripherals::{
        InputLine, OutputLine, PwmLine,
        servo::Servo,
        sim::{Echo, SimOutput, SimPwm, UltrasonicBench},
        ultrasonic::Ultrasonic,
    },
    time::{Clock, ManualClock},
};

/// Steps a simulation runs when `--steps` is not given.
const DEFAULT_SIM_STEPS: u64 = 500;

/// Sweep an ultrasonic sensor and hide from anything that comes close.
#[derive(Debug, Parser)]
#[command(name = "skittish", version, about)]
struct Cli {
    /// TOML config file; defaults are used for anything it leaves out.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Minimum log level (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Also write the log to this file.
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Run on simulated hardware, replaying these readings in cm forever
    /// (comma separated, `-` for no echo).
    #[arg(long, value_name = "READINGS")]
    simulate: Option<Readings>,

    /// Stop after this many loop iterations.
    #[arg(long, value_name = "N")]
    steps: Option<u64>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

/// Scripted echoes for `--simulate`.
#[derive(Debug, Clone)]
struct Readings(Vec<Echo>);

impl FromStr for Readings {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let echoes = s
            .split(',')
            .map(str::trim)
            .map(|item| match item {
                "-" => Ok(Echo::Silent),
                cm => match cm.parse::<f64>() {
                    Ok(cm) if cm.is_finite() && cm > 0.0 => Ok(Echo::at_cm(cm)),
                    _ => Err(format!("`{}` is not a distance in cm or `-`", cm)),
                },
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Readings(echoes))
    }
}

fn main() -> Result<()> {
    let result = run(Cli::parse());
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    log::logger().flush();
    result
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    if cli.print_config {
        let text = toml::to_string_pretty(&config).context("serializing config")?;
        print!("{}", text);
        return Ok(());
    }

    logger::init(cli.log_level, cli.log_file.as_deref()).context("initializing logger")?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .context("installing Ctrl-C handler")?;

    let summary = match cli.simulate {
        Some(Readings(script)) => {
            simulate(&config, script, &running, cli.steps.unwrap_or(DEFAULT_SIM_STEPS))?
        }
        None => run_hardware(&config, &running, cli.steps)?,
    };

    info!(
        "Finished after {} steps, {} detections",
        summary.steps, summary.detections
    );
    Ok(())
}

/// Applies the `[ranging]` section to a sensor on the given lines.
fn ultrasonic<T, E, C>(
    config: &Config,
    trigger: T,
    echo: E,
    clock: C,
) -> Result<Ultrasonic<T, E, C>>
where
    T: OutputLine,
    E: InputLine,
    C: Clock,
{
    let (timeout, pulse, poll) = config.echo_timing()?;
    Ok(Ultrasonic::new(trigger, echo, clock)
        .with_timeout(timeout)
        .with_trigger_pulse(pulse)
        .with_poll_interval(poll)
        .with_speed_of_sound(config.ranging.speed_of_sound_cm_s)
        .with_silent_warning(config.ranging.silent_after))
}

fn servo<P: PwmLine>(config: &Config, pwm: P) -> Result<Servo<P>> {
    let (min_duty, max_duty) = config.servo_duty()?;
    Ok(Servo::new(pwm, min_duty, max_duty))
}

fn simulate(
    config: &Config,
    script: Vec<Echo>,
    running: &AtomicBool,
    steps: u64,
) -> Result<RunSummary> {
    config.validate()?;
    let clock = ManualClock::new();
    let bench = UltrasonicBench::cycling(clock.clone(), script);
    let (trigger, echo) = bench.lines();
    let sensor = ultrasonic(config, trigger, echo, clock.clone())?;
    let (pwm, _) = SimPwm::new();
    let side = || MotorSide::new(SimOutput::new().0, SimOutput::new().0);

    let mut controller = HideController::new(
        sensor,
        servo(config, pwm)?,
        Differential::new(side(), side()),
        clock.clone(),
        config.settings()?,
    )?;
    info!("Simulating {} steps", steps);
    let summary = controller.run(running, Some(steps));
    info!("Simulated time: {}", format_duration(clock.now()));
    Ok(summary)
}

#[cfg(feature = "rpi")]
fn run_hardware(config: &Config, running: &AtomicBool, steps: Option<u64>) -> Result<RunSummary> {
    use skittish::{peripherals::rpi::RpiGpio, time::SystemClock};

    config.validate()?;
    let pins = &config.pins;
    let gpio = RpiGpio::new().context("opening GPIO")?;
    let clock = SystemClock::new();

    let sensor = ultrasonic(config, gpio.output(pins.trigger)?, gpio.input(pins.echo)?, clock)?;
    let pwm = gpio.pwm(pins.servo, config.servo.frequency_hz)?;
    let drivetrain = Differential::new(
        MotorSide::new(gpio.output(pins.left_in1)?, gpio.output(pins.left_in2)?),
        MotorSide::new(gpio.output(pins.right_in3)?, gpio.output(pins.right_in4)?),
    );

    let mut controller =
        HideController::new(sensor, servo(config, pwm)?, drivetrain, clock, config.settings()?)?;
    Ok(controller.run(running, steps))
}

#[cfg(not(feature = "rpi"))]
fn run_hardware(
    _config: &Config,
    _running: &AtomicBool,
    _steps: Option<u64>,
) -> Result<RunSummary> {
    anyhow::bail!("built without GPIO support; rebuild with `--features rpi` or pass --simulate")
}
