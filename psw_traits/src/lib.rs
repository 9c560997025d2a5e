//! Hardware capability traits for the pressure switch.
//!
//! The control core only ever sees these traits; pin numbers, electrical
//! polarity and wire protocols live in the adapters that implement them.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use std::time::Duration;

/// Logical discrete inputs. Levels are reported active-high (`true` = asserted)
/// regardless of wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputLine {
    EncoderA,
    EncoderB,
    EncoderSwitch,
    TareButton,
    StretchEnable,
}

/// Logical discrete outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputLine {
    Relay,
    Haptic,
    Beep,
    Led,
}

impl OutputLine {
    pub const ALL: [OutputLine; 4] = [
        OutputLine::Relay,
        OutputLine::Haptic,
        OutputLine::Beep,
        OutputLine::Led,
    ];
}

/// Load-cell bridge (e.g. HX711). Returns a sign-extended 24-bit sample.
pub trait Bridge {
    fn read(&mut self, timeout: Duration) -> Result<i32, Box<dyn std::error::Error + Send + Sync>>;
}

pub trait DigitalInputs {
    fn read_digital(
        &mut self,
        line: InputLine,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

pub trait DigitalOutputs {
    fn write_digital(
        &mut self,
        line: OutputLine,
        level: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Byte-addressed non-volatile storage (EEPROM or an emulation of it).
pub trait NvStore {
    fn read(
        &mut self,
        addr: u16,
        buf: &mut [u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn write(
        &mut self,
        addr: u16,
        data: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Bridge + ?Sized> Bridge for Box<T> {
    fn read(&mut self, timeout: Duration) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read(timeout)
    }
}

impl<T: DigitalInputs + ?Sized> DigitalInputs for Box<T> {
    fn read_digital(
        &mut self,
        line: InputLine,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_digital(line)
    }
}

impl<T: DigitalOutputs + ?Sized> DigitalOutputs for Box<T> {
    fn write_digital(
        &mut self,
        line: OutputLine,
        level: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).write_digital(line, level)
    }
}

impl<T: NvStore + ?Sized> NvStore for Box<T> {
    fn read(
        &mut self,
        addr: u16,
        buf: &mut [u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).read(addr, buf)
    }
    fn write(
        &mut self,
        addr: u16,
        data: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).write(addr, data)
    }
}
