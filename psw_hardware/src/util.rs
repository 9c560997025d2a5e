use std::time::Duration;

use crate::error::{HwError, Result};

/// Number of polls that fit in `timeout` at `poll_interval` (at least 1).
pub fn polls_for(timeout: Duration, poll_interval: Duration) -> u32 {
    if poll_interval.is_zero() {
        return u32::try_from(timeout.as_micros()).unwrap_or(u32::MAX).max(1);
    }
    let n = timeout.as_nanos() / poll_interval.as_nanos();
    u32::try_from(n).unwrap_or(u32::MAX).max(1)
}

/// Poll `is_ready` until it returns true, at most `max_polls` times,
/// sleeping `poll_interval` between polls.
pub fn wait_for_data_ready(
    mut is_ready: impl FnMut() -> bool,
    max_polls: u32,
    poll_interval: Duration,
) -> Result<()> {
    for _ in 0..max_polls {
        if is_ready() {
            return Ok(());
        }
        if !poll_interval.is_zero() {
            std::thread::sleep(poll_interval);
        }
    }
    if is_ready() {
        return Ok(());
    }
    Err(HwError::Timeout { polls: max_polls })
}

/// Sign-extend a 24-bit two's complement value.
#[inline]
pub fn sign_extend_24(value: u32) -> i32 {
    let v = (value & 0x00FF_FFFF) as i32;
    if v & 0x0080_0000 != 0 { v | !0x00FF_FFFF } else { v }
}
