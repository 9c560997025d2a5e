//! Common time helpers for psw_core.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Residual a step input may still show after the settle window.
pub const SETTLE_RESIDUAL: f32 = 0.05;

/// EMA factor that settles a step to within [`SETTLE_RESIDUAL`] after `n` samples.
///
/// Solves `(1 - a)^n = residual`; `n == 0` is treated as 1 (no smoothing).
#[inline]
pub fn ema_alpha_for_settle(n: u64) -> f32 {
    let n = n.max(1) as f32;
    let a = 1.0 - SETTLE_RESIDUAL.powf(1.0 / n);
    a.clamp(f32::MIN_POSITIVE, 1.0)
}

/// `true` once at least `period_ms` has elapsed since `since_ms`.
#[inline]
pub fn elapsed_at_least(now_ms: u64, since_ms: u64, period_ms: u64) -> bool {
    now_ms.saturating_sub(since_ms) >= period_ms
}
