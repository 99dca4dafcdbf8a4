//! Trailing-stop band step: the ratchet/flip state machine.
//!
//! One step per bar. The same step drives every per-factor band and the
//! adaptive band; only the carried state differs.
//!
//! Ratchet rules (previous close vs previous final band):
//! - resistance: `min(basic_upper, prev_upper)` while the previous close was at
//!   or below it, otherwise the new basic band
//! - support: `max(basic_lower, prev_lower)` while the previous close was at or
//!   above it, otherwise the new basic band
//!
//! Flip rules (strict): bullish → bearish when close < support,
//! bearish → bullish when close > resistance.

use crate::domain::{Bar, Trend};
use serde::{Deserialize, Serialize};

/// Final bands of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    pub upper: f64,
    pub lower: f64,
}

/// State carried from one bar to the next.
///
/// `bands` is `None` until the first bar with defined volatility; the trend
/// then starts from the carried (initially bullish) value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandState {
    pub trend: Trend,
    pub bands: Option<Bands>,
}

impl BandState {
    /// Advance one bar.
    ///
    /// `prev_close` is the close of the bar before `bar` (ignored while no
    /// bands exist yet). `atr` must be finite; callers skip warm-up bars.
    pub fn step(self, bar: &Bar, prev_close: f64, atr: f64, factor: f64) -> BandState {
        let hl2 = bar.hl2();
        let basic_upper = hl2 + factor * atr;
        let basic_lower = hl2 - factor * atr;

        let bands = match self.bands {
            None => Bands {
                upper: basic_upper,
                lower: basic_lower,
            },
            Some(prev) => Bands {
                upper: if prev_close <= prev.upper {
                    basic_upper.min(prev.upper)
                } else {
                    basic_upper
                },
                lower: if prev_close >= prev.lower {
                    basic_lower.max(prev.lower)
                } else {
                    basic_lower
                },
            },
        };

        let trend = match self.trend {
            Trend::Bullish if bar.close < bands.lower => Trend::Bearish,
            Trend::Bearish if bar.close > bands.upper => Trend::Bullish,
            held => held,
        };

        BandState {
            trend,
            bands: Some(bands),
        }
    }

    /// The active line: support while bullish, resistance while bearish.
    pub fn active_band(&self) -> Option<f64> {
        self.bands.map(|b| match self.trend {
            Trend::Bullish => b.lower,
            Trend::Bearish => b.upper,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;

    #[test]
    fn first_step_uses_basic_bands() {
        let bars = make_ohlc_bars(&[(100.0, 102.0, 98.0, 101.0)]);
        let state = BandState::default().step(&bars[0], f64::NAN, 2.0, 3.0);
        assert_eq!(
            state.bands,
            Some(Bands {
                upper: 106.0,
                lower: 94.0
            })
        );
        assert_eq!(state.trend, Trend::Bullish);
        assert_eq!(state.active_band(), Some(94.0));
    }

    #[test]
    fn support_ratchets_up_not_down() {
        let bars = make_ohlc_bars(&[
            (100.0, 102.0, 98.0, 101.0),
            (101.0, 104.0, 100.0, 103.0),
            (103.0, 103.0, 97.0, 99.0),
        ]);
        let s0 = BandState::default().step(&bars[0], f64::NAN, 2.0, 1.0);
        let s1 = s0.step(&bars[1], bars[0].close, 2.0, 1.0);
        // basic lower = 102 - 2 = 100 > 98 → ratchets up
        assert_eq!(s1.bands.unwrap().lower, 100.0);
        let s2 = s1.step(&bars[2], bars[1].close, 2.0, 1.0);
        // basic lower = 100 - 2 = 98 < 100 → held at 100, close 99 < 100 → flip
        assert_eq!(s2.bands.unwrap().lower, 100.0);
        assert_eq!(s2.trend, Trend::Bearish);
        assert_eq!(s2.active_band(), Some(s2.bands.unwrap().upper));
    }

    #[test]
    fn resistance_resets_when_previous_close_broke_above() {
        let prev = BandState {
            trend: Trend::Bearish,
            bands: Some(Bands {
                upper: 100.0,
                lower: 90.0,
            }),
        };
        let bars = make_ohlc_bars(&[(104.0, 106.0, 104.0, 105.0)]);
        // previous close 101 > 100 → basic upper = 105 + 2 = 107
        let next = prev.step(&bars[0], 101.0, 2.0, 1.0);
        assert_eq!(next.bands.unwrap().upper, 107.0);
    }

    #[test]
    fn zero_volatility_collapses_bands_to_price() {
        let bars = make_ohlc_bars(&[(50.0, 50.0, 50.0, 50.0), (50.0, 50.0, 50.0, 50.0)]);
        let s0 = BandState::default().step(&bars[0], f64::NAN, 0.0, 3.0);
        let s1 = s0.step(&bars[1], 50.0, 0.0, 3.0);
        assert_eq!(
            s1.bands,
            Some(Bands {
                upper: 50.0,
                lower: 50.0
            })
        );
        assert_eq!(s1.trend, Trend::Bullish);
    }

    #[test]
    fn no_bands_before_first_step() {
        assert_eq!(BandState::default().active_band(), None);
    }
}
