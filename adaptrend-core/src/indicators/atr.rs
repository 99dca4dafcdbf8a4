//! Average True Range (ATR): the volatility estimate behind every band.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! Smoothing: Wilder recursion `(prev * (p-1) + tr) / p`, seeded with the
//! simple mean of the first `p` proper true ranges.
//! Lookback: period (the first bar has no previous close, so the seed window
//! is TR[1..=p] and the first defined value lands on index `p`).

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

/// Compute the True Range series from bars.
///
/// TR[0] is `NaN`: without a previous close the first bar has no proper
/// true range.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; bars.len()];

    for i in 1..bars.len() {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }

    tr
}

/// Wilder smoothing over a series whose leading element is undefined.
///
/// The seed is the mean of `values[1..=period]`; every later value is
/// `(prev * (period - 1) + values[i]) / period`. Returns all-`NaN` when
/// `values.len() <= period`. A `NaN` input poisons every later value.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n <= period {
        return result;
    }

    let seed = values[1..=period].iter().sum::<f64>() / period as f64;
    result[period] = seed;

    let p = period as f64;
    let mut prev = seed;
    for i in (period + 1)..n {
        prev = (prev * (p - 1.0) + values[i]) / p;
        result[i] = prev;
    }

    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        wilder_smooth(&true_range(bars), self.period)
    }
}
