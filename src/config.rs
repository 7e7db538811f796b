//! Robot configuration.
//!
//! Every setting has a default matching the robot as wired and tuned, so an
//! empty file (or no file at all) gives a working setup. A TOML file only
//! needs the keys it changes:
//!
//! ```toml
//! [sweep]
//! min_deg = 30
//! max_deg = 90
//!
//! [hide.maneuver]
//! kind = "reverse"
//! back_s = 0.5
//!
//! [hide.exit]
//! kind = "clearance"
//! clear_cm = 45
//! clear_hits = 3
//! ```
//!
//! Durations are given in seconds (`*_s` keys) and kept to the microsecond.

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    behavior::{
        controller::{ExitPolicy, Maneuver, Settings},
        sweep::Sweep,
    },
    error::ConfigError,
};

/// Complete robot configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub pins:    PinConfig,
    pub servo:   ServoConfig,
    pub sweep:   SweepConfig,
    pub ranging: RangingConfig,
    pub detect:  DetectConfig,
    pub hide:    HideConfig,
}

/// BCM line numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PinConfig {
    pub servo:     u8,
    pub trigger:   u8,
    /// Must be level-shifted down to 3.3 V.
    pub echo:      u8,
    pub left_in1:  u8,
    pub left_in2:  u8,
    pub right_in3: u8,
    pub right_in4: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            servo:     17,
            trigger:   20,
            echo:      24,
            left_in1:  5,
            left_in2:  6,
            right_in3: 13,
            right_in4: 19,
        }
    }
}

impl PinConfig {
    /// Every line with its role.
    pub fn assignments(&self) -> [(&'static str, u8); 7] {
        [
            ("servo", self.servo),
            ("trigger", self.trigger),
            ("echo", self.echo),
            ("left_in1", self.left_in1),
            ("left_in2", self.left_in2),
            ("right_in3", self.right_in3),
            ("right_in4", self.right_in4),
        ]
    }

    fn check_conflicts(&self) -> Result<(), ConfigError> {
        let lines = self.assignments();
        for (i, (first, line)) in lines.iter().enumerate() {
            if let Some((second, _)) = lines[i + 1..].iter().find(|(_, other)| other == line) {
                return Err(ConfigError::PinConflict {
                    line:   *line,
                    first:  *first,
                    second: *second,
                });
            }
        }
        Ok(())
    }
}

/// Servo signal and positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServoConfig {
    pub frequency_hz:     f64,
    /// Duty cycle (percent) at 0°.
    pub min_duty:         f64,
    /// Duty cycle (percent) at 180°.
    pub max_duty:         f64,
    pub neutral_deg:      f64,
    /// Where the sensor is pointed while hiding.
    pub hide_deg:         f64,
    pub settle_s:         f64,
    pub startup_settle_s: f64,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            frequency_hz:     50.0,
            min_duty:         2.5,
            max_duty:         12.5,
            neutral_deg:      60.0,
            hide_deg:         180.0,
            settle_s:         0.10,
            startup_settle_s: 0.3,
        }
    }
}

/// Sweep range and speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub min_deg:      f64,
    pub max_deg:      f64,
    pub step_deg:     f64,
    pub step_delay_s: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min_deg:      40.0,
            max_deg:      80.0,
            step_deg:     2.0,
            step_delay_s: 0.03,
        }
    }
}

/// Ultrasonic sensor timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RangingConfig {
    /// Bound on each echo wait; 25 ms is about 4 m.
    pub timeout_s:           f64,
    pub trigger_pulse_s:     f64,
    /// Pause between echo polls; zero busy-polls.
    pub poll_interval_s:     f64,
    pub speed_of_sound_cm_s: f64,
    /// Consecutive missed echoes before a warning is logged; zero disables it.
    pub silent_after:        u32,
}

impl Default for RangingConfig {
    fn default() -> Self {
        Self {
            timeout_s:           0.025,
            trigger_pulse_s:     0.000_01,
            poll_interval_s:     0.0,
            speed_of_sound_cm_s: 34_300.0,
            silent_after:        100,
        }
    }
}

/// Detection threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectConfig {
    pub near_cm:   f64,
    pub near_hits: u32,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            near_cm:   35.0,
            near_hits: 2,
        }
    }
}

/// Hiding behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HideConfig {
    pub poll_s:   f64,
    pub maneuver: ManeuverConfig,
    pub exit:     ExitConfig,
}

impl Default for HideConfig {
    fn default() -> Self {
        Self {
            poll_s:   0.05,
            maneuver: ManeuverConfig::default(),
            exit:     ExitConfig::default(),
        }
    }
}

/// See [`Maneuver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManeuverConfig {
    Reverse {
        back_s: f64,
    },
    Spin {
        #[serde(default)]
        back_s:      f64,
        turn_s:      f64,
        #[serde(default = "default_return_turn")]
        return_turn: bool,
    },
}

fn default_return_turn() -> bool { true }

impl Default for ManeuverConfig {
    fn default() -> Self {
        ManeuverConfig::Spin {
            back_s:      0.0,
            turn_s:      0.7,
            return_turn: true,
        }
    }
}

/// See [`ExitPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExitConfig {
    Dwell { hide_s: f64 },
    Clearance { clear_cm: f64, clear_hits: u32 },
}

impl Default for ExitConfig {
    fn default() -> Self { ExitConfig::Dwell { hide_s: 5.0 } }
}

fn seconds(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(Duration::from_micros((value * 1e6).round() as u64))
    } else {
        Err(ConfigError::Duration { name, value })
    }
}

fn angle(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if (0.0..=180.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Angle { name, value })
    }
}

fn distance(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Distance { name, value })
    }
}

fn hits(name: &'static str, value: u32) -> Result<u32, ConfigError> {
    if value == 0 {
        Err(ConfigError::ZeroThreshold { name })
    } else {
        Ok(value)
    }
}

impl Config {
    /// Parses a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML, unknown keys, or values of
    /// the wrong type. The values are not validated; see
    /// [`validate`](Self::validate).
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> { Ok(toml::from_str(text)?) }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings()?;
        self.servo_duty()?;
        self.echo_timing()?;
        self.pins.check_conflicts()
    }

    /// Duty range of the servo as `(min, max)` percent.
    pub fn servo_duty(&self) -> Result<(f64, f64), ConfigError> {
        let ServoConfig {
            min_duty,
            max_duty,
            frequency_hz,
            ..
        } = self.servo;
        if !(0.0 <= min_duty && min_duty < max_duty && max_duty <= 100.0) {
            return Err(ConfigError::DutyRange {
                min: min_duty,
                max: max_duty,
            });
        }
        if !(frequency_hz.is_finite() && frequency_hz > 0.0) {
            return Err(ConfigError::Frequency(frequency_hz));
        }
        Ok((min_duty, max_duty))
    }

    /// Echo timeout, trigger pulse and poll interval.
    pub fn echo_timing(&self) -> Result<(Duration, Duration, Duration), ConfigError> {
        let r = &self.ranging;
        distance("ranging.speed_of_sound_cm_s", r.speed_of_sound_cm_s)?;
        Ok((
            seconds("ranging.timeout_s", r.timeout_s)?,
            seconds("ranging.trigger_pulse_s", r.trigger_pulse_s)?,
            seconds("ranging.poll_interval_s", r.poll_interval_s)?,
        ))
    }

    /// Builds controller [`Settings`], validating as it goes.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let sweep = Sweep::new(self.sweep.min_deg, self.sweep.max_deg, self.sweep.step_deg)?;
        let near_cm = distance("detect.near_cm", self.detect.near_cm)?;

        let maneuver = match self.hide.maneuver {
            ManeuverConfig::Reverse { back_s } => Maneuver::Reverse {
                back: seconds("hide.maneuver.back_s", back_s)?,
            },
            ManeuverConfig::Spin {
                back_s,
                turn_s,
                return_turn,
            } => Maneuver::Spin {
                back: seconds("hide.maneuver.back_s", back_s)?,
                turn: seconds("hide.maneuver.turn_s", turn_s)?,
                return_turn,
            },
        };

        let exit = match self.hide.exit {
            ExitConfig::Dwell { hide_s } => ExitPolicy::Dwell {
                hide_for: seconds("hide.exit.hide_s", hide_s)?,
            },
            ExitConfig::Clearance {
                clear_cm,
                clear_hits,
            } => {
                let clear_cm = distance("hide.exit.clear_cm", clear_cm)?;
                if clear_cm < near_cm {
                    return Err(ConfigError::Hysteresis { near_cm, clear_cm });
                }
                ExitPolicy::Clearance {
                    clear_cm,
                    clear_hits: hits("hide.exit.clear_hits", clear_hits)?,
                }
            }
        };

        Ok(Settings {
            sweep_min: sweep.min(),
            sweep_max: sweep.max(),
            step_deg: sweep.step(),
            step_delay: seconds("sweep.step_delay_s", self.sweep.step_delay_s)?,
            near_cm,
            near_hits: hits("detect.near_hits", self.detect.near_hits)?,
            hide_angle: angle("servo.hide_deg", self.servo.hide_deg)?,
            neutral_angle: angle("servo.neutral_deg", self.servo.neutral_deg)?,
            settle: seconds("servo.settle_s", self.servo.settle_s)?,
            startup_settle: seconds("servo.startup_settle_s", self.servo.startup_settle_s)?,
            hide_poll: seconds("hide.poll_s", self.hide.poll_s)?,
            maneuver,
            exit,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_match_controller_defaults() {
        let settings = Config::default().settings().unwrap();
        assert_eq!(settings, Settings::default());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn partial_document_overrides_only_given_keys() {
        let config = Config::from_toml_str(
            r#"
            [sweep]
            min_deg = 30
            max_deg = 90.0

            [hide.maneuver]
            kind = "reverse"
            back_s = 0.5

            [hide.exit]
            kind = "clearance"
            clear_cm = 45
            clear_hits = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.sweep.min_deg, 30.0);
        assert_eq!(config.sweep.step_deg, 2.0);
        assert_eq!(config.pins, PinConfig::default());

        let settings = config.settings().unwrap();
        assert_eq!(settings.maneuver, Maneuver::Reverse {
            back: Duration::from_millis(500),
        });
        assert_eq!(settings.exit, ExitPolicy::Clearance {
            clear_cm:   45.0,
            clear_hits: 3,
        });
    }

    #[test]
    fn spin_fields_default_inside_variant() {
        let config = Config::from_toml_str(
            r#"
            [hide.maneuver]
            kind = "spin"
            turn_s = 1.0
            "#,
        )
        .unwrap();
        assert_eq!(config.hide.maneuver, ManeuverConfig::Spin {
            back_s:      0.0,
            turn_s:      1.0,
            return_turn: true,
        });
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = Config::from_toml_str("[sweep]\nspeed = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn serialized_default_parses_back() {
        let text = toml::to_string(&Config::default()).unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), Config::default());
    }

    #[test]
    fn clear_distance_below_near_is_rejected() {
        let mut config = Config::default();
        config.hide.exit = ExitConfig::Clearance {
            clear_cm:   30.0,
            clear_hits: 3,
        };
        assert!(matches!(config.validate(), Err(ConfigError::Hysteresis { .. })));
    }

    #[test]
    fn shared_pin_is_rejected() {
        let mut config = Config::default();
        config.pins.echo = config.pins.trigger;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PinConflict {
                line: 20,
                first: "trigger",
                second: "echo",
            })
        ));
    }

    #[rstest]
    #[case("[detect]\nnear_hits = 0\n")]
    #[case("[detect]\nnear_cm = -1\n")]
    #[case("[sweep]\nstep_delay_s = -0.1\n")]
    #[case("[sweep]\nmin_deg = 90\n")]
    #[case("[servo]\nhide_deg = 200\n")]
    #[case("[servo]\nmin_duty = 15\n")]
    #[case("[servo]\nfrequency_hz = 0\n")]
    #[case("[ranging]\ntimeout_s = -1\n")]
    fn invalid_values_fail_validation(#[case] text: &str) {
        let config = Config::from_toml_str(text).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::load("/nonexistent/skittish.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/skittish.toml"));
    }
}
