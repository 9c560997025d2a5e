//! Backend selection: simulated panel and bridge by default, Raspberry Pi
//! GPIO with the `hardware` feature.

use std::path::{Path, PathBuf};

use eyre::WrapErr;
use psw_config::Config;
use psw_hardware::{FileEeprom, Profile, ProfileBridge, RamEeprom, RecordingOutputs, SimulatedPanel};
use psw_traits::{Bridge, DigitalInputs, DigitalOutputs, NvStore};

use crate::cli::SimProfile;

pub type DynBridge = Box<dyn Bridge>;
pub type DynInputs = Box<dyn DigitalInputs>;
pub type DynOutputs = Box<dyn DigitalOutputs>;
pub type DynStore = Box<dyn NvStore>;

/// Time for one ramp or step half-cycle in the simulator.
const SIM_HALF_PERIOD_MS: u64 = 2000;

pub struct Parts {
    pub bridge: DynBridge,
    pub inputs: DynInputs,
    pub outputs: DynOutputs,
}

/// Raw counts for `pct` % of full scale, above tare.
fn pct_to_counts(cfg: &Config, pct: u8) -> i32 {
    let counts = i64::from(cfg.sensor.full_scale_counts) * i64::from(pct) / 100;
    i32::try_from(counts).unwrap_or(i32::MAX)
}

pub fn sim_parts(cfg: &Config, profile: SimProfile, peak_pct: u8) -> Parts {
    let peak = pct_to_counts(cfg, peak_pct);
    let half_period =
        u32::try_from(SIM_HALF_PERIOD_MS / cfg.general.tick_ms.max(1)).unwrap_or(u32::MAX);
    let profile = match profile {
        SimProfile::Ramp => Profile::Ramp { peak, half_period },
        SimProfile::Step => Profile::Step { peak, half_period },
        SimProfile::Hold => Profile::Hold { peak },
    };
    let noise = cfg.sensor.full_scale_counts / 2000;
    tracing::info!(?profile, noise, "using simulated backend");
    Parts {
        bridge: Box::new(ProfileBridge::new(profile, cfg.sensor.zero_counts).with_noise(noise)),
        inputs: Box::new(SimulatedPanel::new()),
        outputs: Box::new(RecordingOutputs::new()),
    }
}

#[cfg(feature = "hardware")]
pub fn hardware_parts(cfg: &Config) -> eyre::Result<Parts> {
    use psw_hardware::{GpioOutputs, GpioPanel, Hx711, PanelPins};
    use psw_traits::OutputLine;

    let p = &cfg.pins;
    let bridge = Hx711::open(p.loadcell_dout, p.loadcell_sck, cfg.sensor.gain_pulses)
        .wrap_err("open hx711")?;
    let panel = GpioPanel::open(
        PanelPins {
            encoder_a: p.encoder_a,
            encoder_b: p.encoder_b,
            encoder_switch: p.encoder_switch,
            tare_button: p.tare_button,
            stretch_enable: p.beep_stretch,
        },
        cfg.input.active_low,
    )
    .wrap_err("open panel pins")?;

    let assignments = psw_core::conversions::enabled_lines(&cfg.outputs)
        .into_iter()
        .map(|line| {
            let pin = match line {
                OutputLine::Relay => Some(p.output),
                OutputLine::Led => Some(p.led),
                OutputLine::Beep => p.beep,
                OutputLine::Haptic => p.haptic,
            };
            pin.map(|pin| (line, pin)).ok_or_else(|| {
                eyre::eyre!("invalid configuration: {line:?} is enabled but has no pin")
            })
        })
        .collect::<eyre::Result<Vec<_>>>()?;
    let outputs = GpioOutputs::open(&assignments).wrap_err("open output pins")?;
    tracing::info!(outputs = assignments.len(), "using gpio backend");

    Ok(Parts {
        bridge: Box::new(bridge),
        inputs: Box::new(panel),
        outputs: Box::new(outputs),
    })
}

/// EEPROM image path: the command-line override, then `storage.eeprom_file`.
pub fn eeprom_path(cfg: &Config, overridden: Option<&Path>) -> Option<PathBuf> {
    overridden
        .map(Path::to_path_buf)
        .or_else(|| cfg.storage.eeprom_file.as_ref().map(PathBuf::from))
}

/// Open the calibration store. Without a file the image lives in RAM and
/// starts erased, so the default level applies.
pub fn open_store(cfg: &Config, overridden: Option<&Path>) -> eyre::Result<DynStore> {
    let capacity = usize::from(cfg.storage.capacity);
    match eeprom_path(cfg, overridden) {
        Some(path) => {
            let store = FileEeprom::open(&path, capacity)
                .wrap_err_with(|| format!("open eeprom image {}", path.display()))?;
            Ok(Box::new(store))
        }
        None => {
            tracing::debug!(capacity, "no eeprom file configured; using volatile image");
            Ok(Box::new(RamEeprom::blank(capacity)))
        }
    }
}
