#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are fine; panics are not.
    let Ok(cfg) = psw_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    // A config that passes file validation must convert into a runtime
    // config that derives its filter constants without panicking.
    let rt = psw_core::SwitchConfig::from(&cfg);
    if rt.validate().is_ok() {
        let alpha = rt.ema_alpha();
        assert!(alpha > 0.0 && alpha <= 1.0, "alpha {alpha}");
        assert!(rt.ticks_per_frame() >= 1);
    }
});
