use psw_config::{load_file, load_toml};
use rstest::rstest;
use std::fs;
use tempfile::tempdir;

#[test]
fn accepts_full_document() {
    let toml = r#"
[general]
default_trigger_level = 40
adjustment_timeout_s = 20
screen_timeout_s = 30
screen_update_ms = 200
tick_ms = 10

[stretch]
period_ms = 1500
gate_on_input = true

[input]
debounce_ms = 300
step_pct = 2

[sensor]
full_scale_counts = 400000
read_timeout_ms = 5
ema_alpha = 0.4
median_window = 3

[threshold]
hysteresis_pct = 3

[storage]
address = 16
max_write_retries = 2

[outputs]
relay = true
haptic = true
beep = false
led = true

[pins]
haptic = 9
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.general.default_trigger_level, 40);
    assert_eq!(cfg.sensor.ema_alpha, Some(0.4));
    assert_eq!(cfg.pins.haptic, Some(9));
    // untouched pins keep their defaults
    assert_eq!(cfg.pins.encoder_a, 1);
}

#[rstest]
#[case("[general]\ndefault_trigger_level = 101", "default_trigger_level must be in [0, 100]")]
#[case("[general]\nadjustment_timeout_s = 0", "adjustment_timeout_s must be >= 1")]
#[case("[general]\ntick_ms = 0", "tick_ms must be in [1, 1000]")]
#[case("[general]\nscreen_update_ms = 5\ntick_ms = 10", "screen_update_ms must be >= general.tick_ms")]
#[case("[input]\nstep_pct = 0", "step_pct must be in [1, 50]")]
#[case("[sensor]\nfull_scale_counts = 0", "full_scale_counts must be > 0")]
#[case("[sensor]\nread_timeout_ms = 50", "read_timeout_ms must not exceed general.tick_ms")]
#[case("[sensor]\nema_alpha = 1.5", "ema_alpha must be in (0.0, 1.0]")]
#[case("[sensor]\nmedian_window = 0", "median_window must be in [1, 15]")]
#[case("[threshold]\nhysteresis_pct = 30", "hysteresis_pct must be in [0, 20]")]
#[case("[storage]\nmax_write_retries = 0", "max_write_retries must be >= 1")]
#[case("[storage]\naddress = 1022", "leaves no room for the calibration record")]
#[case("[outputs]\nrelay = false\nbeep = false\nled = false", "at least one output must be enabled")]
#[case("[outputs]\nbeep = true", "outputs.beep is enabled but pins.beep is not set")]
#[case("[outputs]\nhaptic = true", "outputs.haptic is enabled but pins.haptic is not set")]
#[case("[pins]\nled = 6", "reuses pin 6")]
#[case("[logging]\nrotation = \"weekly\"", "rotation must be one of")]
fn rejects_out_of_range_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    let msg = format!("{err}");
    assert!(msg.contains(needle), "unexpected message: {msg}");
}

#[test]
fn enabled_beep_with_a_pin_is_accepted() {
    let cfg = load_toml("[outputs]\nbeep = true\n\n[pins]\nbeep = 10\n").expect("parse TOML");
    cfg.validate().expect("wired beep should pass");
}

#[test]
fn rejects_unknown_value_types_at_parse_time() {
    let err = load_toml("[general]\ntick_ms = \"fast\"").expect_err("type mismatch");
    assert!(format!("{err}").contains("tick_ms"));
}

#[test]
fn load_file_parses_and_validates() {
    let dir = tempdir().unwrap();
    let good = dir.path().join("good.toml");
    fs::write(&good, "[general]\ndefault_trigger_level = 70\n").unwrap();
    let cfg = load_file(&good).expect("load good");
    assert_eq!(cfg.general.default_trigger_level, 70);

    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "[threshold]\nhysteresis_pct = 99\n").unwrap();
    let err = load_file(&bad).expect_err("validation error");
    assert!(format!("{err}").contains("invalid configuration in"));
    assert!(err.chain().any(|c| c.to_string().contains("hysteresis_pct")));

    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "[general\n").unwrap();
    let err = load_file(&broken).expect_err("parse error");
    assert!(format!("{err}").contains("parse config"));

    let missing = dir.path().join("missing.toml");
    let err = load_file(&missing).expect_err("missing file");
    assert!(format!("{err}").contains("read config"));
}
