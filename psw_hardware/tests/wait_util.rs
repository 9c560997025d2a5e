use std::cell::Cell;
use std::time::Duration;

use psw_hardware::error::HwError;
use psw_hardware::util::{polls_for, sign_extend_24, wait_for_data_ready};
use rstest::rstest;

#[test]
fn ready_after_a_few_polls() {
    let calls = Cell::new(0u32);
    let res = wait_for_data_ready(
        || {
            calls.set(calls.get() + 1);
            calls.get() >= 3
        },
        10,
        Duration::ZERO,
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
    assert_eq!(calls.get(), 3);
}

#[test]
fn never_ready_times_out_with_poll_count() {
    let err = wait_for_data_ready(|| false, 5, Duration::from_micros(10))
        .expect_err("expected timeout error");
    match err {
        HwError::Timeout { polls } => assert_eq!(polls, 5),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("timeout"));
}

#[rstest]
#[case(Duration::from_millis(5), Duration::from_micros(200), 25)]
#[case(Duration::from_millis(1), Duration::from_millis(5), 1)]
#[case(Duration::ZERO, Duration::from_micros(200), 1)]
fn poll_budget(#[case] timeout: Duration, #[case] interval: Duration, #[case] expected: u32) {
    assert_eq!(polls_for(timeout, interval), expected);
}

#[rstest]
#[case(0x00_0000, 0)]
#[case(0x7F_FFFF, 8_388_607)]
#[case(0x80_0000, -8_388_608)]
#[case(0xFF_FFFF, -1)]
fn sign_extension(#[case] raw: u32, #[case] expected: i32) {
    assert_eq!(sign_extend_24(raw), expected);
}
