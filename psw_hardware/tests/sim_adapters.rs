use std::time::Duration;

use psw_hardware::sim::{FileEeprom, RamEeprom, RecordingOutputs, SimulatedBridge, SimulatedPanel};
use psw_traits::{Bridge, DigitalInputs, DigitalOutputs, InputLine, NvStore, OutputLine};

#[test]
fn bridge_handle_drives_reads_and_timeouts() {
    let mut bridge = SimulatedBridge::new();
    let handle = bridge.handle();
    handle.set_raw(1234);
    assert_eq!(bridge.read(Duration::from_millis(5)).unwrap(), 1234);
    handle.fail_next(1);
    let err = bridge.read(Duration::from_millis(5)).unwrap_err();
    assert!(err.to_string().contains("timeout"));
    assert_eq!(bridge.read(Duration::from_millis(5)).unwrap(), 1234);
    assert_eq!(handle.reads(), 2);
}

#[test]
fn panel_lines_default_released() {
    let mut panel = SimulatedPanel::new();
    let handle = panel.handle();
    assert!(!panel.read_digital(InputLine::EncoderSwitch).unwrap());
    handle.press(InputLine::EncoderSwitch);
    handle.set_phases(true, false);
    assert!(panel.read_digital(InputLine::EncoderSwitch).unwrap());
    assert!(panel.read_digital(InputLine::EncoderA).unwrap());
    assert!(!panel.read_digital(InputLine::EncoderB).unwrap());
    handle.set_fail(true);
    assert!(panel.read_digital(InputLine::TareButton).is_err());
}

#[test]
fn outputs_record_levels() {
    let mut out = RecordingOutputs::new();
    let handle = out.handle();
    out.write_digital(OutputLine::Relay, true).unwrap();
    assert!(handle.level(OutputLine::Relay));
    assert!(!handle.level(OutputLine::Led));
    handle.set_fail(true);
    assert!(out.write_digital(OutputLine::Relay, false).is_err());
    assert_eq!(handle.writes(), 1);
}

#[test]
fn ram_eeprom_clones_share_cells() {
    let mut a = RamEeprom::blank(8);
    let b = a.handle();
    a.write(2, &[1, 2, 3]).unwrap();
    assert_eq!(&b.snapshot()[..6], &[0xFF, 0xFF, 1, 2, 3, 0xFF]);
    b.corrupt(3, 9);
    let mut buf = [0u8; 3];
    a.read(2, &mut buf).unwrap();
    assert_eq!(buf, [1, 9, 3]);
}

#[test]
fn ram_eeprom_bounds_and_dropped_writes() {
    let mut e = RamEeprom::zeroed(4);
    assert!(e.write(3, &[1, 2]).is_err());
    e.drop_next_writes(1);
    e.write(0, &[7]).unwrap();
    assert_eq!(e.snapshot()[0], 0);
    assert_eq!(e.writes(), 1);
    e.set_fail(true);
    assert!(e.read(0, &mut [0u8; 1]).is_err());
}

#[test]
fn file_eeprom_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eeprom.bin");
    {
        let mut e = FileEeprom::open(&path, 16).unwrap();
        let mut buf = [0u8; 3];
        e.read(0, &mut buf).unwrap();
        assert_eq!(buf, [0xFF; 3]);
        e.write(4, &[0x5A, 42, !42]).unwrap();
    }
    let mut e = FileEeprom::open(&path, 16).unwrap();
    let mut buf = [0u8; 3];
    e.read(4, &mut buf).unwrap();
    assert_eq!(buf, [0x5A, 42, !42]);
    assert_eq!(std::fs::read(&path).unwrap().len(), 16);
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn file_eeprom_pads_short_images() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.bin");
    std::fs::write(&path, [0x5A]).unwrap();
    let mut e = FileEeprom::open(&path, 4).unwrap();
    let mut buf = [0u8; 4];
    e.read(0, &mut buf).unwrap();
    assert_eq!(buf, [0x5A, 0xFF, 0xFF, 0xFF]);
}
