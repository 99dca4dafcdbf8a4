//! Trend state and directional flip events.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Directional state of a trailing-stop band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    #[default]
    Bullish,
    Bearish,
}

impl Trend {
    /// +1.0 for bullish, -1.0 for bearish.
    pub fn sign(self) -> f64 {
        match self {
            Trend::Bullish => 1.0,
            Trend::Bearish => -1.0,
        }
    }

    pub fn is_bullish(self) -> bool {
        self == Trend::Bullish
    }
}

/// Direction of a trend flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Buy,
    Sell,
}

impl From<Trend> for Direction {
    /// The direction of a flip *into* the given trend.
    fn from(trend: Trend) -> Self {
        match trend {
            Trend::Bullish => Direction::Buy,
            Trend::Bearish => Direction::Sell,
        }
    }
}

/// A detected trend flip.
///
/// Emitted only on bars where the adaptive trend differs from the previous
/// defined bar. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub direction: Direction,
    /// Close of the flip bar.
    pub price: f64,
    /// Bounded heuristic in [0, 10].
    pub strength: f64,
}
