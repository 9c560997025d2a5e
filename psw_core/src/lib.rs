#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Pressure switch control core (hardware-agnostic).
//!
//! All hardware goes through the capability traits in `psw_traits`. The
//! crate is single-threaded: [`SchedulerLoop`] runs every component once per
//! fixed tick against an injected clock.
//!
//! ## Components
//!
//! - **Sampling**: bridge read, median prefilter and EMA (`sampler`)
//! - **Inputs**: debouncing (`debounce`) and quadrature decoding (`encoder`)
//! - **Calibration**: trigger level persistence with read-back verify (`calibrator`)
//! - **Adjustment**: edit mode with inactivity timeout (`adjust`)
//! - **Control**: hysteretic threshold (`threshold`) and stretched outputs (`actuator`)
//! - **Scheduling**: tick ordering, display sleep, diagnostics (`scheduler`)
//!
//! ## Fixed-Point Arithmetic
//!
//! Pressure is carried in centi-percent of full scale (`i32`, 10000 = 100 %).
//! See `fixed_point::counts_to_centi_pct`.

pub mod actuator;
pub mod adjust;
pub mod builder;
pub mod calibrator;
pub mod config;
pub mod conversions;
pub mod debounce;
pub mod diagnostics;
pub mod display;
pub mod encoder;
pub mod error;
pub mod fixed_point;
pub mod hw_error;
pub mod sampler;
pub mod scheduler;
pub mod status;
pub mod threshold;
pub mod util;

pub use actuator::ActuatorDriver;
pub use adjust::{AdjustEvent, AdjustState, AdjustmentInput, AdjustmentStateMachine, ConfirmReason};
pub use builder::SwitchBuilder;
pub use calibrator::{Calibrator, CalibratorStats, StoreOutcome, TriggerLevel};
pub use config::SwitchConfig;
pub use debounce::{Debouncer, Edge};
pub use diagnostics::Diagnostics;
pub use display::{NullDisplay, StatusDisplay, StatusFrame};
pub use encoder::EncoderDecoder;
pub use error::{BuildError, Result, SwitchError};
pub use sampler::{FilteredPressure, SamplerStats, SensorSampler};
pub use scheduler::{SchedulerLoop, TickReport};
pub use status::DeviceState;
pub use threshold::{ActuatorCommand, ThresholdEngine};
