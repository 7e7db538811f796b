//! Raspberry Pi GPIO backend.
//!
//! Claims the lines through [`rppal`]'s character-device GPIO driver. The
//! servo signal is software PWM on an ordinary output line, which is accurate
//! enough for a hobby servo at 50 Hz.
//!
//! # Example
//!
//! ```no_run
//! use skittish::peripherals::{OutputLine, rpi::RpiGpio};
//!
//! let gpio = RpiGpio::new()?;
//! let mut in1 = gpio.output(5)?;
//! in1.set_high();
//! # Ok::<(), skittish::error::HardwareError>(())
//! ```

use log::debug;
use rppal::gpio::{Gpio, InputPin, OutputPin};

use super::{InputLine, OutputLine, PwmLine};
use crate::error::HardwareError;

/// Handle to the GPIO controller.
pub struct RpiGpio {
    gpio: Gpio,
}

impl RpiGpio {
    /// Opens the GPIO controller.
    pub fn new() -> Result<Self, HardwareError> {
        let gpio = Gpio::new().map_err(|e| HardwareError::Unavailable {
            line:   0,
            reason: e.to_string(),
        })?;
        Ok(Self { gpio })
    }

    /// Claims `line` as an output, driven low.
    pub fn output(&self, line: u8) -> Result<RpiOutput, HardwareError> {
        let pin = self.claim(line)?.into_output_low();
        debug!("GPIO {} claimed as output", line);
        Ok(RpiOutput { pin })
    }

    /// Claims `line` as an input.
    pub fn input(&self, line: u8) -> Result<RpiInput, HardwareError> {
        let pin = self.claim(line)?.into_input();
        debug!("GPIO {} claimed as input", line);
        Ok(RpiInput { pin })
    }

    /// Claims `line` for a software PWM signal at `frequency_hz`. The signal
    /// starts on the first duty-cycle write.
    pub fn pwm(&self, line: u8, frequency_hz: f64) -> Result<RpiPwm, HardwareError> {
        let pin = self.claim(line)?.into_output_low();
        debug!("GPIO {} claimed as {} Hz PWM", line, frequency_hz);
        Ok(RpiPwm {
            pin,
            line,
            frequency_hz,
        })
    }

    fn claim(&self, line: u8) -> Result<rppal::gpio::Pin, HardwareError> {
        self.gpio.get(line).map_err(|e| HardwareError::Unavailable {
            line,
            reason: e.to_string(),
        })
    }
}

/// A claimed output line.
pub struct RpiOutput {
    pin: OutputPin,
}

impl OutputLine for RpiOutput {
    fn set_level(&mut self, high: bool) {
        if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
    }
}

/// A claimed input line.
pub struct RpiInput {
    pin: InputPin,
}

impl InputLine for RpiInput {
    fn is_high(&self) -> bool { self.pin.is_high() }
}

/// A software PWM signal on a claimed output line.
pub struct RpiPwm {
    pin:          OutputPin,
    line:         u8,
    frequency_hz: f64,
}

impl PwmLine for RpiPwm {
    fn set_duty_cycle(&mut self, percent: f64) -> Result<(), HardwareError> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(HardwareError::DutyOutOfRange(percent));
        }
        self.pin
            .set_pwm_frequency(self.frequency_hz, percent / 100.0)
            .map_err(|e| HardwareError::Pwm {
                line:   self.line,
                reason: e.to_string(),
            })
    }

    fn disable(&mut self) -> Result<(), HardwareError> {
        self.pin.clear_pwm().map_err(|e| HardwareError::Pwm {
            line:   self.line,
            reason: e.to_string(),
        })?;
        self.pin.set_low();
        Ok(())
    }
}
