//! Adapters implementing the `psw_traits` capabilities.
//!
//! `sim` is always available. The Raspberry Pi drivers (`hx711`, `gpio`)
//! need the `hardware` feature.

pub mod atomic;
pub mod error;
pub mod sim;
pub mod util;

#[cfg(feature = "hardware")]
pub mod gpio;
#[cfg(feature = "hardware")]
pub mod hx711;

pub use error::HwError;
pub use sim::{FileEeprom, Profile, ProfileBridge, RamEeprom, RecordingOutputs, SimulatedBridge, SimulatedPanel};

#[cfg(feature = "hardware")]
pub use gpio::{GpioOutputs, GpioPanel, PanelPins};
#[cfg(feature = "hardware")]
pub use hx711::Hx711;
