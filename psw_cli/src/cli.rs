//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "psw", version, about = "Pressure switch CLI")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/psw_config.toml")]
    pub config: PathBuf,

    /// Emit JSON lines instead of text (frames, summaries, errors and logs)
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Pressure waveform fed to the simulated bridge.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SimProfile {
    /// Triangle up to the peak and back down
    Ramp,
    /// Square wave between zero and the peak
    Step,
    /// Constant peak
    Hold,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop and print status frames
    Run {
        /// Stop after this many ticks (simulated time); runs until Ctrl-C when absent
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Simulated pressure waveform
        #[arg(long, value_enum, default_value = "ramp")]
        profile: SimProfile,
        /// Simulated peak pressure in % of full scale
        #[arg(long, value_name = "PCT", default_value_t = 60, value_parser = clap::value_parser!(u8).range(0..=100))]
        peak: u8,
        /// EEPROM image file (overrides storage.eeprom_file)
        #[arg(long, value_name = "FILE")]
        eeprom: Option<PathBuf>,
    },
    /// Print the persisted trigger level, repairing an invalid record
    Level {
        /// EEPROM image file (overrides storage.eeprom_file)
        #[arg(long, value_name = "FILE")]
        eeprom: Option<PathBuf>,
    },
    /// Store a new trigger level with read-back verification
    SetLevel {
        /// Trigger level in % of full scale
        #[arg(value_name = "PCT", value_parser = clap::value_parser!(u8).range(0..=100))]
        pct: u8,
        /// EEPROM image file (overrides storage.eeprom_file)
        #[arg(long, value_name = "FILE")]
        eeprom: Option<PathBuf>,
    },
    /// Validate the config, the calibration storage and a short simulated run
    SelfCheck,
}
