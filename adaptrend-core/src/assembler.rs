//! Adaptive band assembly: a fold over bars.
//!
//! Each step sees only the previous adaptive `BandState`, the current bar,
//! the previous close, the bar's volatility and the factor selected for the
//! bar. The ratchet reference is the adaptive line's own previous bands,
//! never a per-factor band.

use crate::band::{BandState, Bands};
use crate::domain::{Bar, Trend};

/// Adaptive band output of one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssembledBar {
    pub trend: Trend,
    pub bands: Bands,
    /// Support while bullish, resistance while bearish.
    pub band: f64,
}

/// One assembler step.
///
/// Warm-up bars (`atr` or `factor` undefined) return `None` and hand the
/// carried state through unchanged.
pub fn assemble_step(
    carry: BandState,
    bar: &Bar,
    prev_close: f64,
    atr: f64,
    factor: Option<f64>,
) -> (BandState, Option<AssembledBar>) {
    let factor = match factor {
        Some(f) if !atr.is_nan() => f,
        _ => return (carry, None),
    };

    let next = carry.step(bar, prev_close, atr, factor);
    let out = next.bands.map(|bands| AssembledBar {
        trend: next.trend,
        bands,
        band: match next.trend {
            Trend::Bullish => bands.lower,
            Trend::Bearish => bands.upper,
        },
    });
    (next, out)
}

/// Fold the whole history. `factors[i]` is `None` for warm-up bars.
pub fn assemble(bars: &[Bar], atr: &[f64], factors: &[Option<f64>]) -> Vec<Option<AssembledBar>> {
    debug_assert_eq!(bars.len(), atr.len());
    debug_assert_eq!(bars.len(), factors.len());

    let mut out = Vec::with_capacity(bars.len());
    let mut carry = BandState::default();
    for i in 0..bars.len() {
        let prev_close = if i > 0 { bars[i - 1].close } else { f64::NAN };
        let (next, assembled) = assemble_step(carry, &bars[i], prev_close, atr[i], factors[i]);
        carry = next;
        out.push(assembled);
    }
    out
}
