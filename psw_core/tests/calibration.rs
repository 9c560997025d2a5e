use psw_core::calibrator::{RECORD_MARKER, decode_record, encode_record};
use psw_core::{Calibrator, StoreOutcome, SwitchConfig, SwitchError, TriggerLevel};
use psw_hardware::sim::RamEeprom;
use rstest::rstest;

fn level(p: u8) -> TriggerLevel {
    TriggerLevel::new(p).expect("in range")
}

#[test]
fn every_level_survives_a_power_cycle() {
    let cfg = SwitchConfig::default();
    let eeprom = RamEeprom::blank(64);
    for pct in 0..=100u8 {
        {
            let mut cal = Calibrator::new(eeprom.handle(), &cfg);
            cal.load();
            cal.store(level(pct)).expect("store");
        }
        // fresh calibrator over the same cells
        let mut cal = Calibrator::new(eeprom.handle(), &cfg);
        assert_eq!(cal.load(), level(pct), "level {pct}");
    }
}

#[rstest]
#[case::all_zero(vec![0, 0, 0])]
#[case::erased(vec![0xFF, 0xFF, 0xFF])]
#[case::bad_marker(vec![0x5B, 40, !40])]
#[case::bad_check(vec![RECORD_MARKER, 40, 41])]
#[case::out_of_range(vec![RECORD_MARKER, 150, !150])]
fn corrupt_record_heals_to_default(#[case] image: Vec<u8>) {
    let cfg = SwitchConfig::default();
    let mut bytes = image;
    bytes.resize(16, 0xFF);
    let eeprom = RamEeprom::from_bytes(bytes);

    let mut cal = Calibrator::new(eeprom.handle(), &cfg);
    assert_eq!(cal.load(), level(50));
    assert_eq!(cal.stats().self_heals, 1);
    assert_eq!(eeprom.writes(), 1);

    let mut again = Calibrator::new(eeprom.handle(), &cfg);
    assert_eq!(again.load(), level(50));
    assert_eq!(again.stats().self_heals, 0);
    assert_eq!(eeprom.writes(), 1);
}

#[test]
fn record_honours_configured_address() {
    let mut cfg = SwitchConfig::default();
    cfg.storage.address = 10;
    let eeprom = RamEeprom::blank(16);
    let mut cal = Calibrator::new(eeprom.handle(), &cfg);
    cal.load();
    cal.store(level(77)).expect("store");
    let snap = eeprom.snapshot();
    assert_eq!(&snap[10..13], &encode_record(level(77)));
    assert_eq!(&snap[..3], &[0xFF; 3]);
}

#[test]
fn unreadable_storage_keeps_running_on_default() {
    let cfg = SwitchConfig::default();
    let eeprom = RamEeprom::blank(16);
    eeprom.set_fail(true);
    let mut cal = Calibrator::new(eeprom.handle(), &cfg);
    assert_eq!(cal.load(), level(50));
    assert!(cal.persistence_fault());
}

#[test]
fn failed_verify_raises_fault_and_keeps_level() {
    let cfg = SwitchConfig::default();
    let eeprom = RamEeprom::blank(16);
    let mut cal = Calibrator::new(eeprom.handle(), &cfg);
    cal.load();
    cal.store(level(30)).expect("store");

    eeprom.drop_next_writes(u32::from(cfg.storage.max_write_retries));
    let err = cal.store(level(31)).expect_err("all attempts dropped");
    assert_eq!(err, SwitchError::StorageWriteMismatch { attempts: 3 });
    assert_eq!(cal.level(), level(30));
    assert!(cal.persistence_fault());
    let snap = eeprom.snapshot();
    assert_eq!(decode_record(&[snap[0], snap[1], snap[2]]), Ok(level(30)));

    assert_eq!(cal.store(level(31)), Ok(StoreOutcome::Written { attempts: 1 }));
    assert!(!cal.persistence_fault());
}

#[test]
fn storing_same_value_twice_writes_once() {
    let cfg = SwitchConfig::default();
    let eeprom = RamEeprom::blank(16);
    let mut cal = Calibrator::new(eeprom.handle(), &cfg);
    cal.load();
    let before = eeprom.writes();
    assert!(matches!(cal.store(level(64)), Ok(StoreOutcome::Written { .. })));
    assert_eq!(cal.store(level(64)), Ok(StoreOutcome::Unchanged));
    assert_eq!(eeprom.writes(), before + 1);
    assert_eq!(cal.stats().store_calls, 3);
}
