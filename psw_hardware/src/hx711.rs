//! HX711 load-cell amplifier over rppal GPIO.

use std::time::Duration;

use psw_traits::Bridge;
use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::{polls_for, sign_extend_24, wait_for_data_ready};

pub struct Hx711 {
    dout: InputPin,
    sck: OutputPin,
    gain_pulses: u8, // 25, 26, 27 based on gain/channel
    poll_interval: Duration,
}

impl Hx711 {
    pub fn new(dout: InputPin, mut sck: OutputPin, gain_pulses: u8) -> Self {
        sck.set_low(); // clock idle low
        Self {
            dout,
            sck,
            gain_pulses,
            poll_interval: Duration::from_micros(200),
        }
    }

    /// Claim the two BCM pins and build the driver.
    pub fn open(dout_pin: u8, sck_pin: u8, gain_pulses: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let dout = gpio
            .get(dout_pin)
            .map_err(|e| HwError::Gpio(format!("dout pin {dout_pin}: {e}")))?
            .into_input();
        let sck = gpio
            .get(sck_pin)
            .map_err(|e| HwError::Gpio(format!("sck pin {sck_pin}: {e}")))?
            .into_output();
        Ok(Self::new(dout, sck, gain_pulses))
    }

    pub fn read_with_timeout(&mut self, timeout: Duration) -> Result<i32> {
        let max_polls = polls_for(timeout, self.poll_interval);
        let dout = &self.dout;
        // DOUT goes low when a conversion is ready
        wait_for_data_ready(|| dout.is_low(), max_polls, self.poll_interval)?;

        let mut value: u32 = 0;
        for _ in 0..24 {
            self.sck.set_high();
            spin_delay_100ns();
            value = (value << 1) | u32::from(self.dout.is_high());
            self.sck.set_low();
            spin_delay_100ns();
        }

        // extra pulses select gain/channel for the next conversion
        for _ in 0..self.gain_pulses.saturating_sub(24) {
            self.sck.set_high();
            spin_delay_100ns();
            self.sck.set_low();
            spin_delay_100ns();
        }

        let raw = sign_extend_24(value);
        trace!(raw, "hx711 raw read");
        Ok(raw)
    }
}

impl Bridge for Hx711 {
    fn read(&mut self, timeout: Duration) -> std::result::Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.read_with_timeout(timeout)?)
    }
}

#[inline(always)]
fn spin_delay_100ns() {
    std::hint::spin_loop();
}
