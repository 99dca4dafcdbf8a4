//! Trend-flip detection.

use crate::domain::{Bar, Direction, SignalEvent, Trend};

/// Upper bound of a signal's strength.
pub const MAX_STRENGTH: f64 = 10.0;

/// `min(10, |metric| * 100)`; a non-finite metric scores 0.
pub fn strength(performance_metric: f64) -> f64 {
    if !performance_metric.is_finite() {
        return 0.0;
    }
    (performance_metric.abs() * 100.0).min(MAX_STRENGTH)
}

/// Emit one event per trend change between consecutive defined bars.
///
/// `trends[i]` and `metrics[i]` are `None` during warm-up; the first defined
/// bar never emits.
pub fn detect_flips(
    bars: &[Bar],
    trends: &[Option<Trend>],
    metrics: &[Option<f64>],
) -> Vec<SignalEvent> {
    debug_assert_eq!(bars.len(), trends.len());
    let mut events = Vec::new();
    let mut prev: Option<Trend> = None;

    for (i, trend) in trends.iter().enumerate() {
        let Some(trend) = *trend else { continue };
        if let Some(p) = prev {
            if p != trend {
                events.push(SignalEvent {
                    bar_index: i,
                    timestamp: bars[i].timestamp,
                    direction: Direction::from(trend),
                    price: bars[i].close,
                    strength: strength(metrics[i].unwrap_or(0.0)),
                });
            }
        }
        prev = Some(trend);
    }

    events
}
