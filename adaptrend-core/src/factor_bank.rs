//! Candidate factor bank and the per-factor band bank.
//!
//! Candidates are `min + i * step` for every `i` that stays within `max`
//! (with a small tolerance so `1.0..=5.0 step 0.5` contains 5.0). The set is
//! ascending and fixed for the whole invocation.
//!
//! Each candidate runs its own trailing-stop recurrence over the history. The
//! per-factor bands are never displayed; only their trend signs are kept, to
//! drive the performance tracker.

use crate::band::BandState;
use crate::domain::Bar;

/// Tolerance on the upper bound when enumerating candidates.
const RANGE_TOLERANCE: f64 = 1e-9;

/// Largest candidate pool the engine accepts.
pub const MAX_CANDIDATES: usize = 10_000;

/// Number of candidates in `min..=max` by `step`.
///
/// Zero for invalid input, `None` when the pool would exceed
/// [`MAX_CANDIDATES`].
pub fn checked_candidate_count(min: f64, max: f64, step: f64) -> Option<usize> {
    if !(min.is_finite() && max.is_finite() && step.is_finite()) || step <= 0.0 || min > max {
        return Some(0);
    }
    // Counted in f64 first: the range-to-step ratio may not fit a usize.
    let steps = ((max - min) / step + RANGE_TOLERANCE).floor();
    if !steps.is_finite() || steps >= MAX_CANDIDATES as f64 {
        return None;
    }
    (steps as usize).checked_add(1)
}

/// Number of candidates in `min..=max` by `step`. Zero for invalid or
/// oversized input.
pub fn candidate_count(min: f64, max: f64, step: f64) -> usize {
    checked_candidate_count(min, max, step).unwrap_or(0)
}

/// Enumerate candidate multipliers, ascending.
pub fn candidates(min: f64, max: f64, step: f64) -> Vec<f64> {
    (0..candidate_count(min, max, step))
        .map(|i| min + i as f64 * step)
        .collect()
}

/// Trend-sign series of one candidate: +1 bullish, -1 bearish, 0 during warm-up.
pub fn factor_trend_signs(bars: &[Bar], atr: &[f64], factor: f64) -> Vec<f64> {
    debug_assert_eq!(bars.len(), atr.len());
    let mut signs = vec![0.0; bars.len()];
    let mut state = BandState::default();

    for i in 0..bars.len() {
        if atr[i].is_nan() {
            continue;
        }
        let prev_close = if i > 0 { bars[i - 1].close } else { f64::NAN };
        state = state.step(&bars[i], prev_close, atr[i], factor);
        signs[i] = state.trend.sign();
    }

    signs
}

/// Trend signs for every candidate: `signs[f][i]`.
pub fn band_bank_signs(bars: &[Bar], atr: &[f64], factors: &[f64]) -> Vec<Vec<f64>> {
    factors
        .iter()
        .map(|&factor| factor_trend_signs(bars, atr, factor))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_bars, Atr, Indicator};

    #[test]
    fn candidates_inclusive_of_max() {
        assert_eq!(
            candidates(1.0, 5.0, 0.5),
            vec![1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0]
        );
    }

    #[test]
    fn candidates_with_inexact_step() {
        let c = candidates(0.1, 0.3, 0.1);
        assert_eq!(c.len(), 3);
        assert!((c[2] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn single_candidate_when_min_equals_max() {
        assert_eq!(candidates(2.0, 2.0, 1.0), vec![2.0]);
    }

    #[test]
    fn invalid_ranges_yield_nothing() {
        assert_eq!(candidate_count(3.0, 1.0, 1.0), 0);
        assert_eq!(candidate_count(1.0, 3.0, 0.0), 0);
        assert_eq!(candidate_count(1.0, f64::INFINITY, 1.0), 0);
    }

    #[test]
    fn oversized_pool_is_not_counted() {
        assert_eq!(checked_candidate_count(0.0, 1e300, 1e-300), None);
        assert_eq!(checked_candidate_count(-1e308, 1e308, 1.0), None);
        assert_eq!(checked_candidate_count(1.0, 1e10, 1.0), None);
        assert_eq!(candidate_count(1.0, 1e10, 1.0), 0);
        assert!(candidates(1.0, 1e10, 1.0).is_empty());

        let at_cap = checked_candidate_count(0.0, (MAX_CANDIDATES - 1) as f64, 1.0);
        assert_eq!(at_cap, Some(MAX_CANDIDATES));
        assert_eq!(checked_candidate_count(0.0, MAX_CANDIDATES as f64, 1.0), None);
    }

    #[test]
    fn candidates_are_sorted() {
        let c = candidates(0.5, 7.25, 0.25);
        assert!(c.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn trend_signs_zero_during_warmup() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let atr = Atr::new(5).compute(&bars);
        let signs = factor_trend_signs(&bars, &atr, 2.0);
        assert!(signs[..5].iter().all(|&s| s == 0.0));
        assert!(signs[5..].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn tight_factor_flips_before_wide_factor() {
        let mut closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        closes.extend((1..=6).map(|i| 129.0 - 2.0 * i as f64));
        let bars = make_bars(&closes);
        let atr = Atr::new(5).compute(&bars);
        let bank = band_bank_signs(&bars, &atr, &[0.5, 10.0]);

        let first_bear = |signs: &[f64]| signs.iter().position(|&s| s < 0.0);
        let tight = first_bear(&bank[0]).expect("tight band flips");
        if let Some(wide) = first_bear(&bank[1]) {
            assert!(tight < wide);
        }
    }
}
