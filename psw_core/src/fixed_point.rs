//! Fixed-point centi-percent arithmetic.
//!
//! Pressure is carried as `i32` centi-percent of full scale (10000 = 100 %),
//! so the control path compares integers only.

/// Centi-percent per whole percent.
pub const CENTI: i32 = 100;
/// Full scale in centi-percent.
pub const FULL_SCALE_CENTI: i32 = 100 * CENTI;

/// Average of two i32 values, rounded to nearest with ties away from zero.
/// Uses 64-bit intermediates; cannot overflow.
#[inline]
pub fn avg2_round_nearest_i32(a: i32, b: i32) -> i32 {
    let s = i64::from(a) + i64::from(b);
    let avg = if s >= 0 { (s + 1) / 2 } else { (s - 1) / 2 };
    clamp_i64_to_i32(avg)
}

/// Convert raw bridge counts to centi-percent of full scale.
///
/// Rounds to nearest and saturates to the `i32` range. `full_scale_counts`
/// must be positive; non-positive values yield 0.
#[inline]
pub fn counts_to_centi_pct(raw: i32, zero: i32, full_scale_counts: i32) -> i32 {
    if full_scale_counts <= 0 {
        return 0;
    }
    let num = (i64::from(raw) - i64::from(zero)) * i64::from(FULL_SCALE_CENTI);
    let den = i64::from(full_scale_counts);
    let q = if num >= 0 {
        (num + den / 2) / den
    } else {
        (num - den / 2) / den
    };
    clamp_i64_to_i32(q)
}

/// Quantize a filtered floating-point value to centi-percent.
/// Non-finite values map to 0.
#[inline]
pub fn quantize_centi(x: f32) -> i32 {
    if !x.is_finite() {
        return 0;
    }
    let r = x.round();
    if r >= i32::MAX as f32 {
        i32::MAX
    } else if r <= i32::MIN as f32 {
        i32::MIN
    } else {
        r as i32
    }
}

#[inline]
fn clamp_i64_to_i32(v: i64) -> i32 {
    i32::try_from(v).unwrap_or(if v < 0 { i32::MIN } else { i32::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avg2_extremes_and_signs() {
        assert_eq!(avg2_round_nearest_i32(i32::MAX, i32::MAX), i32::MAX);
        assert_eq!(avg2_round_nearest_i32(i32::MIN, i32::MIN), i32::MIN);
        assert_eq!(avg2_round_nearest_i32(i32::MAX, i32::MIN), -1);
        assert_eq!(avg2_round_nearest_i32(1, 2), 2);
        assert_eq!(avg2_round_nearest_i32(-5, -6), -6);
    }

    #[test]
    fn counts_map_linearly_onto_full_scale() {
        assert_eq!(counts_to_centi_pct(0, 0, 1_000_000), 0);
        assert_eq!(counts_to_centi_pct(500_000, 0, 1_000_000), 5000);
        assert_eq!(counts_to_centi_pct(1_000_000, 0, 1_000_000), 10_000);
        assert_eq!(counts_to_centi_pct(1_100, 100, 1_000), 10_000);
        assert_eq!(counts_to_centi_pct(-50, 0, 1_000), -500);
    }

    #[test]
    fn counts_saturate_and_reject_bad_scale() {
        assert_eq!(counts_to_centi_pct(i32::MAX, i32::MIN, 1), i32::MAX);
        assert_eq!(counts_to_centi_pct(10, 0, 0), 0);
    }

    #[test]
    fn quantize_handles_non_finite() {
        assert_eq!(quantize_centi(f32::NAN), 0);
        assert_eq!(quantize_centi(12.5), 13);
        assert_eq!(quantize_centi(f32::INFINITY), 0);
    }
}
