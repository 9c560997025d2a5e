//! Panel inputs and switched outputs over rppal GPIO.

use psw_traits::{DigitalInputs, DigitalOutputs, InputLine, OutputLine};
use rppal::gpio::{Gpio, InputPin, OutputPin};

use crate::error::{HwError, Result};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// BCM pin numbers for the panel inputs.
#[derive(Debug, Clone, Copy)]
pub struct PanelPins {
    pub encoder_a: u8,
    pub encoder_b: u8,
    pub encoder_switch: u8,
    pub tare_button: u8,
    pub stretch_enable: u8,
}

impl PanelPins {
    fn assignments(&self) -> [(InputLine, u8); 5] {
        [
            (InputLine::EncoderA, self.encoder_a),
            (InputLine::EncoderB, self.encoder_b),
            (InputLine::EncoderSwitch, self.encoder_switch),
            (InputLine::TareButton, self.tare_button),
            (InputLine::StretchEnable, self.stretch_enable),
        ]
    }
}

fn gpio() -> Result<Gpio> {
    Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))
}

/// Panel inputs with internal pull-ups. With `active_low`, a grounded pin
/// reads as asserted.
pub struct GpioPanel {
    pins: Vec<(InputLine, InputPin)>,
    active_low: bool,
}

impl GpioPanel {
    pub fn open(pins: PanelPins, active_low: bool) -> Result<Self> {
        let gpio = gpio()?;
        let mut claimed = Vec::with_capacity(5);
        for (line, pin) in pins.assignments() {
            let p = gpio
                .get(pin)
                .map_err(|e| HwError::Gpio(format!("{line:?} pin {pin}: {e}")))?;
            let input = if active_low {
                p.into_input_pullup()
            } else {
                p.into_input_pulldown()
            };
            claimed.push((line, input));
        }
        Ok(Self {
            pins: claimed,
            active_low,
        })
    }
}

impl DigitalInputs for GpioPanel {
    fn read_digital(&mut self, line: InputLine) -> std::result::Result<bool, BoxError> {
        let (_, pin) = self
            .pins
            .iter()
            .find(|(l, _)| *l == line)
            .ok_or_else(|| HwError::Gpio(format!("{line:?} not wired")))?;
        Ok(pin.is_high() != self.active_low)
    }
}

/// Output lines driven active-high.
pub struct GpioOutputs {
    pins: Vec<(OutputLine, OutputPin)>,
}

impl GpioOutputs {
    pub fn open(assignments: &[(OutputLine, u8)]) -> Result<Self> {
        let gpio = gpio()?;
        let mut pins = Vec::with_capacity(assignments.len());
        for &(line, pin) in assignments {
            let mut out = gpio
                .get(pin)
                .map_err(|e| HwError::Gpio(format!("{line:?} pin {pin}: {e}")))?
                .into_output();
            out.set_low();
            pins.push((line, out));
        }
        Ok(Self { pins })
    }
}

impl DigitalOutputs for GpioOutputs {
    fn write_digital(&mut self, line: OutputLine, level: bool) -> std::result::Result<(), BoxError> {
        let (_, pin) = self
            .pins
            .iter_mut()
            .find(|(l, _)| *l == line)
            .ok_or_else(|| HwError::Gpio(format!("{line:?} not wired")))?;
        if level {
            pin.set_high();
        } else {
            pin.set_low();
        }
        Ok(())
    }
}
