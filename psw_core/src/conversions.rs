//! `From` implementations bridging `psw_config` types to `psw_core` types.

use psw_traits::OutputLine;

use crate::config::{
    ActuatorCfg, DiagnosticsCfg, InputCfg, SensorCfg, StorageCfg, SwitchConfig, ThresholdCfg,
    TimingCfg,
};
use crate::util::MILLIS_PER_SEC;

// ── TimingCfg ────────────────────────────────────────────────────────────────

impl From<&psw_config::General> for TimingCfg {
    fn from(c: &psw_config::General) -> Self {
        Self {
            tick_ms: c.tick_ms,
            screen_update_ms: c.screen_update_ms,
            screen_timeout_ms: c.screen_timeout_s.saturating_mul(MILLIS_PER_SEC),
            adjustment_timeout_ms: c.adjustment_timeout_s.saturating_mul(MILLIS_PER_SEC),
        }
    }
}

// ── SensorCfg ────────────────────────────────────────────────────────────────

impl From<&psw_config::SensorCfg> for SensorCfg {
    fn from(c: &psw_config::SensorCfg) -> Self {
        Self {
            full_scale_counts: c.full_scale_counts,
            zero_counts: c.zero_counts,
            read_timeout_ms: c.read_timeout_ms,
            ema_alpha: c.ema_alpha,
            median_window: c.median_window,
        }
    }
}

impl From<&psw_config::InputCfg> for InputCfg {
    fn from(c: &psw_config::InputCfg) -> Self {
        Self {
            debounce_ms: c.debounce_ms,
            phase_debounce_ms: c.phase_debounce_ms,
            step_pct: c.step_pct,
        }
    }
}

impl From<&psw_config::ThresholdCfg> for ThresholdCfg {
    fn from(c: &psw_config::ThresholdCfg) -> Self {
        Self {
            hysteresis_pct: c.hysteresis_pct,
        }
    }
}

// ── ActuatorCfg ──────────────────────────────────────────────────────────────

/// Enabled output lines in `OutputLine::ALL` order.
pub fn enabled_lines(c: &psw_config::OutputsCfg) -> Vec<OutputLine> {
    OutputLine::ALL
        .into_iter()
        .filter(|line| match line {
            OutputLine::Relay => c.relay,
            OutputLine::Haptic => c.haptic,
            OutputLine::Beep => c.beep,
            OutputLine::Led => c.led,
        })
        .collect()
}

impl From<&psw_config::Config> for ActuatorCfg {
    fn from(c: &psw_config::Config) -> Self {
        Self {
            stretch_ms: c.stretch.period_ms,
            gate_on_input: c.stretch.gate_on_input,
            feedback_pulse_ms: c.stretch.feedback_pulse_ms,
            lines: enabled_lines(&c.outputs),
        }
    }
}

impl From<&psw_config::StorageCfg> for StorageCfg {
    fn from(c: &psw_config::StorageCfg) -> Self {
        Self {
            address: c.address,
            max_write_retries: c.max_write_retries,
        }
    }
}

impl From<&psw_config::Diagnostics> for DiagnosticsCfg {
    fn from(c: &psw_config::Diagnostics) -> Self {
        Self {
            enabled: c.enabled,
            interval_ms: c.interval_ms,
        }
    }
}

// ── SwitchConfig ─────────────────────────────────────────────────────────────

impl From<&psw_config::Config> for SwitchConfig {
    fn from(c: &psw_config::Config) -> Self {
        Self {
            default_trigger_level: c.general.default_trigger_level,
            timing: TimingCfg::from(&c.general),
            sensor: SensorCfg::from(&c.sensor),
            input: InputCfg::from(&c.input),
            threshold: ThresholdCfg::from(&c.threshold),
            actuator: ActuatorCfg::from(c),
            storage: StorageCfg::from(&c.storage),
            diagnostics: DiagnosticsCfg::from(&c.diagnostics),
        }
    }
}
