#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the pressure switch.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section is optional; defaults reproduce the device's factory
//!   constants so an empty file is a valid configuration.
use eyre::WrapErr;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Size in bytes of the persisted trigger-level record (marker, level, complement).
pub const CALIBRATION_RECORD_LEN: u16 = 3;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct General {
    /// Trigger level in % of full-scale pressure; replaced by the stored value when valid.
    pub default_trigger_level: u8,
    /// Seconds without encoder/switch input before adjustment mode confirms itself.
    pub adjustment_timeout_s: u64,
    /// Seconds of inactivity before the display sleeps.
    pub screen_timeout_s: u64,
    /// Display refresh period (ms). Also the settle horizon for the pressure filter.
    pub screen_update_ms: u64,
    /// Control loop tick (ms).
    pub tick_ms: u64,
}

impl Default for General {
    fn default() -> Self {
        Self {
            default_trigger_level: 50,
            adjustment_timeout_s: 20,
            screen_timeout_s: 30,
            screen_update_ms: 200,
            tick_ms: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StretchCfg {
    /// Minimum on-time of the outputs once triggered (ms).
    pub period_ms: u64,
    /// Only stretch while the stretch-enable input is asserted.
    pub gate_on_input: bool,
    /// One-shot output pulse issued when a new trigger level is confirmed (0 disables).
    pub feedback_pulse_ms: u64,
}

impl Default for StretchCfg {
    fn default() -> Self {
        Self {
            period_ms: 2000,
            gate_on_input: false,
            feedback_pulse_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InputCfg {
    /// Debounce period for the encoder push-switch and the tare button (ms).
    pub debounce_ms: u64,
    /// Debounce period for the two encoder phases (ms); 0 accepts a level on the tick it is seen.
    pub phase_debounce_ms: u64,
    /// Trigger-level change per encoder detent (%).
    pub step_pct: u8,
    /// Inputs use pull-ups and read low when asserted.
    pub active_low: bool,
}

impl Default for InputCfg {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            phase_debounce_ms: 0,
            step_pct: 1,
            active_low: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorCfg {
    /// Raw counts (above tare) that correspond to 100 % pressure.
    pub full_scale_counts: i32,
    /// Tare baseline in raw counts applied at boot.
    pub zero_counts: i32,
    /// Max wait for the bridge to report data-ready (ms).
    pub read_timeout_ms: u64,
    /// Explicit EMA smoothing factor in (0.0, 1.0]; derived from the display period when absent.
    pub ema_alpha: Option<f32>,
    /// Median prefilter window (1 = disabled).
    pub median_window: usize,
    /// HX711 trailing clock pulses selecting gain/channel for the next conversion (25..=27).
    pub gain_pulses: u8,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            full_scale_counts: 1_000_000,
            zero_counts: 0,
            read_timeout_ms: 5,
            ema_alpha: None,
            median_window: 1,
            gain_pulses: 25,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ThresholdCfg {
    /// Release margin below the trigger level (%).
    pub hysteresis_pct: u8,
}

impl Default for ThresholdCfg {
    fn default() -> Self {
        Self { hysteresis_pct: 2 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageCfg {
    /// Byte address of the calibration record.
    pub address: u16,
    /// Total EEPROM size in bytes.
    pub capacity: u16,
    /// Write-then-verify attempts before giving up on a store.
    pub max_write_retries: u8,
    /// File backing the emulated EEPROM (simulation builds).
    pub eeprom_file: Option<String>,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            address: 0,
            capacity: 1024,
            max_write_retries: 3,
            eeprom_file: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputsCfg {
    pub relay: bool,
    pub haptic: bool,
    pub beep: bool,
    pub led: bool,
}

impl Default for OutputsCfg {
    fn default() -> Self {
        Self {
            relay: true,
            haptic: false,
            beep: false,
            led: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    pub encoder_a: u8,
    pub encoder_b: u8,
    pub encoder_switch: u8,
    pub tare_button: u8,
    pub beep_stretch: u8,
    pub loadcell_sck: u8,
    pub loadcell_dout: u8,
    pub output: u8,
    pub led: u8,
    pub haptic: Option<u8>,
    pub beep: Option<u8>,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            encoder_a: 1,
            encoder_b: 0,
            // A0 / A1 on a 32u4 board
            encoder_switch: 18,
            tare_button: 19,
            beep_stretch: 7,
            loadcell_sck: 4,
            loadcell_dout: 5,
            output: 6,
            led: 13,
            haptic: None,
            beep: None,
        }
    }
}

impl Pins {
    fn assignments(&self) -> Vec<(&'static str, u8)> {
        let mut v = vec![
            ("encoder_a", self.encoder_a),
            ("encoder_b", self.encoder_b),
            ("encoder_switch", self.encoder_switch),
            ("tare_button", self.tare_button),
            ("beep_stretch", self.beep_stretch),
            ("loadcell_sck", self.loadcell_sck),
            ("loadcell_dout", self.loadcell_dout),
            ("output", self.output),
            ("led", self.led),
        ];
        if let Some(p) = self.haptic {
            v.push(("haptic", p));
        }
        if let Some(p) = self.beep {
            v.push(("beep", p));
        }
        v
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Diagnostics {
    /// Emit periodic status lines.
    pub enabled: bool,
    /// Serial console speed on microcontroller boards; informational on hosted builds.
    pub baud_rate: u32,
    /// Period between status lines (ms).
    pub interval_ms: u64,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            enabled: true,
            baud_rate: 9600,
            interval_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub stretch: StretchCfg,
    pub input: InputCfg,
    pub sensor: SensorCfg,
    pub threshold: ThresholdCfg,
    pub storage: StorageCfg,
    pub outputs: OutputsCfg,
    pub pins: Pins,
    pub diagnostics: Diagnostics,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid configuration in {}", path.display()))?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // General
        if self.general.default_trigger_level > 100 {
            eyre::bail!("general.default_trigger_level must be in [0, 100]");
        }
        if self.general.adjustment_timeout_s == 0 {
            eyre::bail!("general.adjustment_timeout_s must be >= 1");
        }
        if self.general.adjustment_timeout_s > 60 * 60 {
            eyre::bail!("general.adjustment_timeout_s is unreasonably large (>1h)");
        }
        if self.general.screen_timeout_s == 0 {
            eyre::bail!("general.screen_timeout_s must be >= 1");
        }
        if self.general.tick_ms == 0 || self.general.tick_ms > 1000 {
            eyre::bail!("general.tick_ms must be in [1, 1000]");
        }
        if self.general.screen_update_ms < self.general.tick_ms {
            eyre::bail!("general.screen_update_ms must be >= general.tick_ms");
        }

        // Stretch
        if self.stretch.period_ms > 60 * 1000 {
            eyre::bail!("stretch.period_ms is unreasonably large (>60s)");
        }
        if self.stretch.feedback_pulse_ms > 5 * 1000 {
            eyre::bail!("stretch.feedback_pulse_ms is unreasonably large (>5s)");
        }

        // Input
        if self.input.debounce_ms > 5 * 1000 {
            eyre::bail!("input.debounce_ms is unreasonably large (>5s)");
        }
        if self.input.phase_debounce_ms > self.input.debounce_ms {
            eyre::bail!("input.phase_debounce_ms must not exceed input.debounce_ms");
        }
        if self.input.step_pct == 0 || self.input.step_pct > 50 {
            eyre::bail!("input.step_pct must be in [1, 50]");
        }

        // Sensor
        if self.sensor.full_scale_counts <= 0 {
            eyre::bail!("sensor.full_scale_counts must be > 0");
        }
        if self.sensor.read_timeout_ms == 0 {
            eyre::bail!("sensor.read_timeout_ms must be >= 1");
        }
        if self.sensor.read_timeout_ms > self.general.tick_ms {
            eyre::bail!("sensor.read_timeout_ms must not exceed general.tick_ms");
        }
        if let Some(alpha) = self.sensor.ema_alpha
            && !(alpha > 0.0 && alpha <= 1.0)
        {
            eyre::bail!("sensor.ema_alpha must be in (0.0, 1.0]");
        }
        if self.sensor.median_window == 0 || self.sensor.median_window > 15 {
            eyre::bail!("sensor.median_window must be in [1, 15]");
        }
        if !(25..=27).contains(&self.sensor.gain_pulses) {
            eyre::bail!("sensor.gain_pulses must be 25, 26 or 27");
        }

        // Threshold
        if self.threshold.hysteresis_pct > 20 {
            eyre::bail!("threshold.hysteresis_pct must be in [0, 20]");
        }

        // Storage
        if self.storage.max_write_retries == 0 {
            eyre::bail!("storage.max_write_retries must be >= 1");
        }
        if u32::from(self.storage.address) + u32::from(CALIBRATION_RECORD_LEN)
            > u32::from(self.storage.capacity)
        {
            eyre::bail!("storage.address leaves no room for the calibration record");
        }

        // Outputs
        let o = &self.outputs;
        if !(o.relay || o.haptic || o.beep || o.led) {
            eyre::bail!("outputs: at least one output must be enabled");
        }
        if o.haptic && self.pins.haptic.is_none() {
            eyre::bail!("outputs.haptic is enabled but pins.haptic is not set");
        }
        if o.beep && self.pins.beep.is_none() {
            eyre::bail!("outputs.beep is enabled but pins.beep is not set");
        }

        // Pins
        let mut seen: HashMap<u8, &'static str> = HashMap::new();
        for (name, pin) in self.pins.assignments() {
            if let Some(other) = seen.insert(pin, name) {
                eyre::bail!("pins.{name} reuses pin {pin} already assigned to pins.{other}");
            }
        }

        // Diagnostics
        if self.diagnostics.enabled && self.diagnostics.interval_ms < 100 {
            eyre::bail!("diagnostics.interval_ms must be >= 100");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_factory_defaults() {
        let cfg = load_toml("").expect("parse empty");
        assert_eq!(cfg.general.default_trigger_level, 50);
        assert_eq!(cfg.general.adjustment_timeout_s, 20);
        assert_eq!(cfg.general.screen_timeout_s, 30);
        assert_eq!(cfg.general.screen_update_ms, 200);
        assert_eq!(cfg.stretch.period_ms, 2000);
        assert_eq!(cfg.input.debounce_ms, 500);
        assert_eq!(cfg.diagnostics.baud_rate, 9600);
        assert_eq!(cfg.pins.output, 6);
        assert_eq!(cfg.pins.led, 13);
        cfg.validate().expect("defaults validate");
    }

    #[test]
    fn default_outputs_all_have_pins() {
        let cfg = Config::default();
        assert!(!cfg.outputs.beep && cfg.pins.beep.is_none());
        assert!(!cfg.outputs.haptic && cfg.pins.haptic.is_none());
    }

    #[test]
    fn pin_assignments_include_optional_lines() {
        let pins = Pins {
            haptic: Some(9),
            ..Pins::default()
        };
        assert!(pins.assignments().contains(&("haptic", 9)));
        assert!(!pins.assignments().iter().any(|(n, _)| *n == "beep"));
    }
}
