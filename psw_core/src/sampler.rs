//! Sensor acquisition and filtering.
//!
//! Each tick the sampler performs one bounded read of the bridge, converts
//! counts to centi-percent of full scale, then runs an optional median
//! prefilter and an EMA. A failed read holds the previous value and bumps a
//! fault counter; it never stops the loop.

use std::collections::VecDeque;
use std::time::Duration;

use psw_traits::Bridge;

use crate::config::SwitchConfig;
use crate::error::SwitchError;
use crate::fixed_point::{CENTI, avg2_round_nearest_i32, counts_to_centi_pct, quantize_centi};
use crate::hw_error::map_hw_error;

/// Smoothed pressure in hundredths of a percent of full scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilteredPressure(pub i32);

impl FilteredPressure {
    pub const ZERO: Self = Self(0);

    /// Pressure from whole percent.
    pub const fn from_pct(pct: i32) -> Self {
        Self(pct.saturating_mul(CENTI))
    }

    #[inline]
    pub const fn centi(self) -> i32 {
        self.0
    }

    /// Whole percent, truncated toward zero.
    #[inline]
    pub const fn whole_pct(self) -> i32 {
        self.0 / CENTI
    }

    #[inline]
    pub fn as_pct_f32(self) -> f32 {
        self.0 as f32 / CENTI as f32
    }
}

/// Read fault counters (diagnostics only).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub samples: u64,
    pub timeouts: u64,
    pub errors: u64,
}

pub struct SensorSampler<B: Bridge> {
    bridge: B,
    read_timeout: Duration,
    zero_counts: i32,
    full_scale_counts: i32,
    median_window: usize,
    alpha: f32,
    med_buf: VecDeque<i32>,
    tmp_med_buf: Vec<i32>,
    ema_prev: Option<f32>,
    last_raw: Option<i32>,
    filtered: FilteredPressure,
    stats: SamplerStats,
}

impl<B: Bridge> SensorSampler<B> {
    pub fn new(bridge: B, cfg: &SwitchConfig) -> Self {
        let median_window = cfg.sensor.median_window.max(1);
        Self {
            bridge,
            read_timeout: Duration::from_millis(cfg.sensor.read_timeout_ms),
            zero_counts: cfg.sensor.zero_counts,
            full_scale_counts: cfg.sensor.full_scale_counts,
            median_window,
            alpha: cfg.ema_alpha(),
            med_buf: VecDeque::with_capacity(median_window),
            tmp_med_buf: Vec::with_capacity(median_window),
            ema_prev: None,
            last_raw: None,
            filtered: FilteredPressure::ZERO,
            stats: SamplerStats::default(),
        }
    }

    /// Take one reading and return the updated filtered pressure.
    ///
    /// On any read failure the previous value is returned unchanged.
    pub fn sample(&mut self) -> FilteredPressure {
        match self.bridge.read(self.read_timeout) {
            Ok(raw) => {
                tracing::trace!(raw, "bridge sample");
                self.stats.samples += 1;
                self.last_raw = Some(raw);
                let centi = counts_to_centi_pct(raw, self.zero_counts, self.full_scale_counts);
                self.filtered = FilteredPressure(self.apply_filter(centi));
            }
            Err(e) => match map_hw_error(&*e) {
                SwitchError::SensorTimeout => {
                    self.stats.timeouts += 1;
                    tracing::debug!(timeouts = self.stats.timeouts, "sensor read timed out; holding value");
                }
                other => {
                    self.stats.errors += 1;
                    tracing::warn!(error = %other, "sensor read failed; holding value");
                }
            },
        }
        self.filtered
    }

    fn apply_filter(&mut self, x: i32) -> i32 {
        let after_median = if self.median_window > 1 {
            self.med_buf.push_back(x);
            if self.med_buf.len() > self.median_window {
                self.med_buf.pop_front();
            }
            self.tmp_med_buf.clear();
            self.tmp_med_buf.extend(self.med_buf.iter().copied());
            self.tmp_med_buf.sort_unstable();
            let n = self.tmp_med_buf.len();
            let mid = n / 2;
            if n.is_multiple_of(2) {
                avg2_round_nearest_i32(self.tmp_med_buf[mid - 1], self.tmp_med_buf[mid])
            } else {
                self.tmp_med_buf[mid]
            }
        } else {
            x
        };

        let x = after_median as f32;
        let y = match self.ema_prev {
            None => x,
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
        };
        self.ema_prev = Some(y);
        quantize_centi(y)
    }

    /// Use the most recent raw reading as the new zero and restart filtering.
    ///
    /// Returns the new baseline, or `None` if nothing has been read yet.
    pub fn tare(&mut self) -> Option<i32> {
        let raw = self.last_raw?;
        self.zero_counts = raw;
        self.med_buf.clear();
        self.ema_prev = None;
        self.filtered = FilteredPressure::ZERO;
        tracing::info!(zero_counts = raw, "tare");
        Some(raw)
    }

    pub fn filtered(&self) -> FilteredPressure {
        self.filtered
    }

    pub fn last_raw(&self) -> Option<i32> {
        self.last_raw
    }

    pub fn zero_counts(&self) -> i32 {
        self.zero_counts
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn stats(&self) -> SamplerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct SeqBridge {
        seq: VecDeque<Result<i32, &'static str>>,
    }

    impl Bridge for SeqBridge {
        fn read(&mut self, _timeout: Duration) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
            match self.seq.pop_front() {
                Some(Ok(v)) => Ok(v),
                Some(Err(msg)) => Err(msg.into()),
                None => Err("timeout".into()),
            }
        }
    }

    fn sampler(seq: Vec<Result<i32, &'static str>>, alpha: f32, median: usize) -> SensorSampler<SeqBridge> {
        let mut cfg = SwitchConfig::default();
        cfg.sensor.full_scale_counts = 10_000;
        cfg.sensor.ema_alpha = Some(alpha);
        cfg.sensor.median_window = median;
        SensorSampler::new(SeqBridge { seq: seq.into() }, &cfg)
    }

    #[test]
    fn starts_at_zero_and_passes_through_with_unit_alpha() {
        let mut s = sampler(vec![Ok(5_000)], 1.0, 1);
        assert_eq!(s.filtered(), FilteredPressure::ZERO);
        assert_eq!(s.sample(), FilteredPressure::from_pct(50));
    }

    #[test]
    fn timeout_holds_previous_value_and_counts() {
        let mut s = sampler(vec![Ok(2_000), Err("timeout waiting for data")], 1.0, 1);
        assert_eq!(s.sample().whole_pct(), 20);
        assert_eq!(s.sample().whole_pct(), 20);
        assert_eq!(s.stats().timeouts, 1);
        assert_eq!(s.stats().errors, 0);
    }

    #[test]
    fn other_errors_are_counted_separately() {
        let mut s = sampler(vec![Err("bus fault")], 1.0, 1);
        assert_eq!(s.sample(), FilteredPressure::ZERO);
        assert_eq!(s.stats().errors, 1);
    }

    #[test]
    fn median_rejects_single_spike() {
        let mut s = sampler(vec![Ok(1_000), Ok(1_000), Ok(9_000), Ok(1_000)], 1.0, 3);
        for _ in 0..4 {
            s.sample();
        }
        assert_eq!(s.filtered().whole_pct(), 10);
    }

    #[test]
    fn ema_moves_toward_step() {
        let mut s = sampler(vec![Ok(0), Ok(10_000)], 0.5, 1);
        s.sample();
        assert_eq!(s.sample(), FilteredPressure::from_pct(50));
    }

    #[test]
    fn tare_rebases_on_last_raw() {
        let mut s = sampler(vec![Ok(3_000), Ok(4_000)], 1.0, 1);
        assert_eq!(s.tare(), None);
        s.sample();
        assert_eq!(s.tare(), Some(3_000));
        assert_eq!(s.filtered(), FilteredPressure::ZERO);
        assert_eq!(s.sample().whole_pct(), 10);
    }
}
