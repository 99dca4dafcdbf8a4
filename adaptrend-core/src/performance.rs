//! Per-candidate performance tracker.
//!
//! For candidate f and bar i > 0:
//!
//! ```text
//! P_f(i) = P_f(i-1) + α · (Δclose(i) · sign_f(i-1) − P_f(i-1))
//! ```
//!
//! with `P_f(0) = 0` and `sign_f` the candidate's trend sign (0 during
//! warm-up). Alongside, the tracker keeps `D(i)`, the same EMA of `|Δclose|`,
//! which normalises the performance metric into price-independent units.

use crate::domain::Bar;

/// Bar-major table of performance scores.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceTable {
    /// `scores[i][f]`: score of candidate `f` after bar `i`.
    scores: Vec<Vec<f64>>,
    /// EMA of absolute close-to-close change, one per bar.
    normaliser: Vec<f64>,
}

impl PerformanceTable {
    /// Run the tracker over the full history.
    ///
    /// `signs[f][i]` is candidate `f`'s trend sign at bar `i`.
    pub fn compute(bars: &[Bar], signs: &[Vec<f64>], alpha: f64) -> Self {
        let n = bars.len();
        let n_factors = signs.len();
        let mut scores = Vec::with_capacity(n);
        let mut normaliser = Vec::with_capacity(n);

        if n == 0 {
            return Self { scores, normaliser };
        }

        scores.push(vec![0.0; n_factors]);
        normaliser.push(0.0);

        for i in 1..n {
            let delta = bars[i].close - bars[i - 1].close;
            let prev = &scores[i - 1];
            let row: Vec<f64> = (0..n_factors)
                .map(|f| prev[f] + alpha * (delta * signs[f][i - 1] - prev[f]))
                .collect();
            let d_prev = normaliser[i - 1];
            normaliser.push(d_prev + alpha * (delta.abs() - d_prev));
            scores.push(row);
        }

        Self { scores, normaliser }
    }

    /// Scores of every candidate at bar `i`, in candidate order.
    pub fn scores_at(&self, i: usize) -> &[f64] {
        &self.scores[i]
    }

    /// EMA of `|Δclose|` at bar `i`.
    pub fn normaliser_at(&self, i: usize) -> f64 {
        self.normaliser[i]
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
