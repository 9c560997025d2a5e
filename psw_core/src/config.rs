//! Runtime configuration for the control core.
//!
//! One `SwitchConfig` is built at startup (usually from `psw_config::Config`
//! via the `From` impls in `conversions`) and handed by reference to every
//! component constructor. Nothing in the core reads global settings.

use psw_traits::OutputLine;

use crate::error::{BuildError, Result};
use crate::util::ema_alpha_for_settle;

/// Tick, display and mode timeouts, all in milliseconds.
#[derive(Debug, Clone)]
pub struct TimingCfg {
    /// Scheduler tick.
    pub tick_ms: u64,
    /// Display frame period.
    pub screen_update_ms: u64,
    /// Inactivity before the display sleeps.
    pub screen_timeout_ms: u64,
    /// Inactivity before adjustment mode confirms itself.
    pub adjustment_timeout_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            screen_update_ms: 200,
            screen_timeout_ms: 30_000,
            adjustment_timeout_ms: 20_000,
        }
    }
}

/// Sensor conversion and filtering.
#[derive(Debug, Clone)]
pub struct SensorCfg {
    /// Raw counts above tare that correspond to 100 %.
    pub full_scale_counts: i32,
    /// Tare baseline at boot.
    pub zero_counts: i32,
    /// Bounded wait for bridge data-ready.
    pub read_timeout_ms: u64,
    /// Explicit EMA factor; derived from the display period when `None`.
    pub ema_alpha: Option<f32>,
    /// Median prefilter window (1 = disabled).
    pub median_window: usize,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            full_scale_counts: 1_000_000,
            zero_counts: 0,
            read_timeout_ms: 5,
            ema_alpha: None,
            median_window: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputCfg {
    /// Push-switch and tare button debounce.
    pub debounce_ms: u64,
    /// Encoder phase debounce.
    pub phase_debounce_ms: u64,
    /// Trigger-level change per encoder detent (%).
    pub step_pct: u8,
}

impl Default for InputCfg {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            phase_debounce_ms: 0,
            step_pct: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThresholdCfg {
    /// Release margin below the trigger level (%).
    pub hysteresis_pct: u8,
}

impl Default for ThresholdCfg {
    fn default() -> Self {
        Self { hysteresis_pct: 2 }
    }
}

#[derive(Debug, Clone)]
pub struct ActuatorCfg {
    /// Minimum on-time after a rising trigger (0 disables stretching).
    pub stretch_ms: u64,
    /// Stretch only while the stretch-enable input is asserted.
    pub gate_on_input: bool,
    /// Pulse issued when a trigger level is confirmed (0 disables).
    pub feedback_pulse_ms: u64,
    /// Lines driven together by the actuator.
    pub lines: Vec<OutputLine>,
}

impl Default for ActuatorCfg {
    fn default() -> Self {
        Self {
            stretch_ms: 2000,
            gate_on_input: false,
            feedback_pulse_ms: 0,
            lines: vec![OutputLine::Relay, OutputLine::Led],
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageCfg {
    /// Byte address of the calibration record.
    pub address: u16,
    /// Write-then-verify attempts per store.
    pub max_write_retries: u8,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            address: 0,
            max_write_retries: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiagnosticsCfg {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl Default for DiagnosticsCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 1000,
        }
    }
}

/// Immutable configuration shared by reference with every component.
#[derive(Debug, Clone)]
pub struct SwitchConfig {
    /// Trigger level used when storage holds no valid record.
    pub default_trigger_level: u8,
    pub timing: TimingCfg,
    pub sensor: SensorCfg,
    pub input: InputCfg,
    pub threshold: ThresholdCfg,
    pub actuator: ActuatorCfg,
    pub storage: StorageCfg,
    pub diagnostics: DiagnosticsCfg,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            default_trigger_level: 50,
            timing: TimingCfg::default(),
            sensor: SensorCfg::default(),
            input: InputCfg::default(),
            threshold: ThresholdCfg::default(),
            actuator: ActuatorCfg::default(),
            storage: StorageCfg::default(),
            diagnostics: DiagnosticsCfg::default(),
        }
    }
}

impl SwitchConfig {
    /// Number of ticks in one display frame (at least 1).
    pub fn ticks_per_frame(&self) -> u64 {
        (self.timing.screen_update_ms / self.timing.tick_ms.max(1)).max(1)
    }

    /// Effective EMA smoothing factor.
    ///
    /// When not configured, chosen so a step input settles to 95 % within
    /// one display frame.
    pub fn ema_alpha(&self) -> f32 {
        match self.sensor.ema_alpha {
            Some(a) if a.is_finite() && a > 0.0 => a.min(1.0),
            _ => ema_alpha_for_settle(self.ticks_per_frame()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &'static str| Err(eyre::Report::new(BuildError::InvalidConfig(msg)));
        if self.default_trigger_level > 100 {
            return invalid("default trigger level must be <= 100");
        }
        if self.timing.tick_ms == 0 {
            return invalid("tick_ms must be >= 1");
        }
        if self.timing.adjustment_timeout_ms == 0 {
            return invalid("adjustment timeout must be >= 1 ms");
        }
        if self.timing.screen_timeout_ms == 0 {
            return invalid("screen timeout must be >= 1 ms");
        }
        if self.sensor.full_scale_counts <= 0 {
            return invalid("full_scale_counts must be > 0");
        }
        if self.sensor.read_timeout_ms == 0 {
            return invalid("sensor read timeout must be >= 1 ms");
        }
        if self.sensor.median_window == 0 {
            return invalid("median_window must be >= 1");
        }
        if self.input.step_pct == 0 {
            return invalid("step_pct must be >= 1");
        }
        if self.threshold.hysteresis_pct > 100 {
            return invalid("hysteresis_pct must be <= 100");
        }
        if self.actuator.lines.is_empty() {
            return invalid("at least one output line is required");
        }
        if self.storage.max_write_retries == 0 {
            return invalid("max_write_retries must be >= 1");
        }
        Ok(())
    }
}
