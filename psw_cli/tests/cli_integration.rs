use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

// Minimal config; everything not named falls back to the defaults
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[general]
default_trigger_level = 50
tick_ms = 10
screen_update_ms = 200

[sensor]
full_scale_counts = 100000

[diagnostics]
enabled = false
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn psw(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("psw").unwrap();
    cmd.arg("--log-level").arg("error").arg("--config").arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--ticks", "300", "--profile", "hold", "--peak", "80"], 0, "run complete", "stdout")]
#[case(&["run", "--ticks", "10", "--peak", "150"], 2, "150", "stderr")]
#[case(&["set-level", "101", "--eeprom", "x.bin"], 2, "101", "stderr")]
#[case(&["level"], 0, "trigger level: 50%", "stdout")]
#[case(&["self-check"], 0, "self-check ok", "stdout")]
#[case(&["set-level", "60"], 3, "set-level needs", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = psw(&cfg);
    cmd.current_dir(dir.path());
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    let matcher = predicate::str::contains(needle);
    match stream {
        "stdout" => {
            assert.stdout(matcher);
        }
        _ => {
            assert.stderr(matcher);
        }
    }
}

#[test]
fn held_pressure_above_level_leaves_outputs_on_at_the_end() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    psw(&cfg)
        .args(["run", "--ticks", "300", "--profile", "hold", "--peak", "80"])
        .assert()
        .success()
        .stdout(predicate::str::contains("state triggered"))
        .stdout(predicate::str::contains("output on"));
}

#[test]
fn pressure_below_level_never_triggers() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    psw(&cfg)
        .args(["run", "--ticks", "300", "--profile", "hold", "--peak", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("output off"))
        .stdout(predicate::str::contains("ON").not());
}

#[test]
fn set_level_survives_a_restart() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let eeprom = dir.path().join("eeprom.bin");

    psw(&cfg)
        .args(["set-level", "63", "--eeprom"])
        .arg(&eeprom)
        .assert()
        .success()
        .stdout(predicate::str::contains("50% -> 63%"));

    psw(&cfg)
        .args(["level", "--eeprom"])
        .arg(&eeprom)
        .assert()
        .success()
        .stdout(predicate::str::contains("trigger level: 63%"));

    // Storing the same value again writes nothing
    psw(&cfg)
        .args(["set-level", "63", "--eeprom"])
        .arg(&eeprom)
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing written"));
}

#[test]
fn corrupt_record_is_repaired_on_read() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let eeprom = dir.path().join("eeprom.bin");
    // Marker ok, complement wrong
    let mut image = vec![0xFF; 1024];
    image[..3].copy_from_slice(&[0x5A, 70, 0x00]);
    fs::write(&eeprom, &image).unwrap();

    psw(&cfg)
        .args(["level", "--eeprom"])
        .arg(&eeprom)
        .assert()
        .success()
        .stdout(predicate::str::contains("trigger level: 50%"))
        .stdout(predicate::str::contains("default restored"));

    let healed = fs::read(&eeprom).unwrap();
    assert_eq!(&healed[..3], &[0x5A, 50, !50u8]);

    psw(&cfg)
        .args(["level", "--eeprom"])
        .arg(&eeprom)
        .assert()
        .success()
        .stdout(predicate::str::contains("default restored").not());
}

#[test]
fn run_uses_level_from_eeprom() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let eeprom = dir.path().join("eeprom.bin");
    psw(&cfg)
        .args(["set-level", "90", "--eeprom"])
        .arg(&eeprom)
        .assert()
        .success();

    // 80 % never reaches a 90 % trigger level
    psw(&cfg)
        .args(["run", "--ticks", "300", "--profile", "hold", "--peak", "80", "--eeprom"])
        .arg(&eeprom)
        .assert()
        .success()
        .stdout(predicate::str::contains("level 90%"))
        .stdout(predicate::str::contains("output off"));
}

#[rstest]
#[case("[general]\ndefault_trigger_level = 150\n", "default_trigger_level")]
#[case("[general]\ntick_ms = 0\n", "tick_ms")]
#[case("[outputs]\nrelay = false\nbeep = false\nled = false\n", "at least one output")]
#[case("[general\n", "parse config")]
#[case("[outputs]\nbeep = true\n", "pins.beep is not set")]
fn invalid_config_exits_with_config_code(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, toml).unwrap();
    psw(&path)
        .arg("self-check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    psw(&dir.path().join("absent.toml"))
        .arg("level")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn unwritable_eeprom_path_is_a_storage_error() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let eeprom = dir.path().join("no_such_dir").join("eeprom.bin");
    psw(&cfg)
        .args(["set-level", "40", "--eeprom"])
        .arg(&eeprom)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("EEPROM image"));
}
