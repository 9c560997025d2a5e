//! Human-readable error descriptions and structured JSON error formatting.

use psw_core::error::{BuildError, SwitchError};
use psw_hardware::HwError;

/// Exit codes. 2 is left to clap for usage errors.
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG: u8 = 3;
pub const EXIT_STORAGE: u8 = 4;
pub const EXIT_HARDWARE: u8 = 5;

fn is_config_message(lower: &str) -> bool {
    lower.contains("invalid configuration")
        || lower.contains("config file")
        || lower.contains("parse config")
        || lower.contains("read config")
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingBridge => {
                "What happened: No pressure sensor was provided to the switch.\nLikely causes: The HX711 failed to initialize or was not wired into the builder.\nHow to fix: Ensure the bridge is created successfully and passed via with_bridge(...).".to_string()
            }
            BuildError::MissingInputs => {
                "What happened: No input panel was provided to the switch.\nLikely causes: Encoder/button pins failed to initialize.\nHow to fix: Check the [pins] section and GPIO permissions.".to_string()
            }
            BuildError::MissingOutputs => {
                "What happened: No outputs were provided to the switch.\nLikely causes: Output pins failed to initialize.\nHow to fix: Check [outputs] and [pins] in the config.".to_string()
            }
            BuildError::MissingStore => {
                "What happened: No calibration storage was provided.\nLikely causes: The EEPROM image could not be opened.\nHow to fix: Check storage.eeprom_file or pass --eeprom.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/psw_config.toml for a sample."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<SwitchError>() {
        return match se {
            SwitchError::StorageWriteMismatch { attempts } => format!(
                "What happened: The new trigger level did not read back correctly after {attempts} attempt(s); the previous level is kept.\nLikely causes: Worn or write-protected EEPROM, or a read-only image file.\nHow to fix: Check the storage medium and permissions, then retry set-level."
            ),
            SwitchError::StorageCorruption(msg) | SwitchError::Storage(msg) => format!(
                "What happened: Calibration storage failed ({msg}).\nLikely causes: Unreadable or truncated EEPROM image.\nHow to fix: Check storage.eeprom_file and storage.address; run `psw level` to repair the record."
            ),
            SwitchError::SensorTimeout => {
                "What happened: Pressure sensor read timed out.\nLikely causes: HX711 not wired correctly, no power/ground, or timeout too low.\nHow to fix: Verify DOUT/SCK pins and power, and consider increasing sensor.read_timeout_ms.".to_string()
            }
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(hw) = err.downcast_ref::<HwError>() {
        return match hw {
            HwError::Io(e) => format!(
                "What happened: Could not access the EEPROM image ({e}).\nLikely causes: Missing directory or insufficient permissions.\nHow to fix: Check the --eeprom path or storage.eeprom_file."
            ),
            HwError::Timeout { polls } => format!(
                "What happened: HX711 did not produce data after {polls} polls.\nLikely causes: Wrong DOUT/SCK pins or wiring/power issues.\nHow to fix: Check [pins] in the config and verify 5V/GND."
            ),
            HwError::Gpio(msg) => format!(
                "What happened: Failed to initialize GPIO ({msg}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process may access GPIO."
            ),
            HwError::Storage(msg) => format!(
                "What happened: Storage device error ({msg}).\nLikely causes: Address outside the image or a failing device.\nHow to fix: Check storage.address and storage.capacity."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open hx711") || lower.contains("open panel pins") || lower.contains("open output pins") {
        return "What happened: Failed to initialize hardware pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    if is_config_message(&lower) {
        let detail = err
            .chain()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(": ");
        return format!(
            "What happened: Configuration is invalid or incomplete ({detail}).\nLikely causes: Syntax errors, unknown values, or out-of-range settings in the TOML.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable process exit code per error family.
pub fn exit_code_for_error(err: &eyre::Report) -> u8 {
    if err.downcast_ref::<BuildError>().is_some() {
        return EXIT_CONFIG;
    }
    if let Some(se) = err.downcast_ref::<SwitchError>() {
        return match se {
            SwitchError::StorageWriteMismatch { .. }
            | SwitchError::StorageCorruption(_)
            | SwitchError::Storage(_) => EXIT_STORAGE,
            SwitchError::Config(_) => EXIT_CONFIG,
            SwitchError::SensorTimeout | SwitchError::Hardware(_) => EXIT_HARDWARE,
        };
    }
    if let Some(hw) = err.downcast_ref::<HwError>() {
        return match hw {
            HwError::Io(_) | HwError::Storage(_) => EXIT_STORAGE,
            HwError::Gpio(_) | HwError::Timeout { .. } => EXIT_HARDWARE,
        };
    }
    if is_config_message(&err.to_string().to_ascii_lowercase()) {
        return EXIT_CONFIG;
    }
    EXIT_FAILURE
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match exit_code_for_error(err) {
        EXIT_CONFIG => "Config",
        EXIT_STORAGE => "Storage",
        EXIT_HARDWARE => "Hardware",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;
    use rstest::rstest;

    #[test]
    fn write_mismatch_is_a_storage_failure() {
        let err = eyre::Report::new(SwitchError::StorageWriteMismatch { attempts: 3 });
        assert_eq!(exit_code_for_error(&err), EXIT_STORAGE);
        assert!(humanize(&err).contains("previous level is kept"));
    }

    #[test]
    fn wrapped_hardware_error_is_still_recognised() {
        let err: eyre::Result<()> =
            Err(HwError::Gpio("pin 99".into())).wrap_err("open panel pins");
        let err = err.unwrap_err();
        assert_eq!(exit_code_for_error(&err), EXIT_HARDWARE);
        assert!(humanize(&err).contains("GPIO"));
    }

    #[rstest]
    #[case("invalid configuration: etc/x.toml", EXIT_CONFIG)]
    #[case("config file not found: nope.toml", EXIT_CONFIG)]
    #[case("something unrelated", EXIT_FAILURE)]
    fn string_heuristics(#[case] msg: &'static str, #[case] code: u8) {
        let err = eyre::eyre!(msg);
        assert_eq!(exit_code_for_error(&err), code);
    }

    #[test]
    fn json_error_has_reason_and_message() {
        let err = eyre::Report::new(BuildError::InvalidConfig("tick_ms must be >= 1"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Config");
        assert_eq!(v["exit_code"], 3);
        assert!(v["message"].as_str().unwrap().contains("tick_ms"));
    }
}
