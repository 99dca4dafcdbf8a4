//! Per-bar adaptive state and the immutable result of one invocation.

use serde::{Deserialize, Serialize};

use crate::domain::{SignalEvent, Trend};

/// Adaptive output of one bar after warm-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveState {
    pub trend: Trend,
    /// Active line: support while bullish, resistance while bearish.
    pub band: f64,
    pub upper: f64,
    pub lower: f64,
    pub selected_factor: f64,
    /// Index of the selected cluster in the centroid-sorted list.
    pub cluster_index: usize,
    pub performance_metric: f64,
    /// Centroids of this bar's clusters, ascending.
    pub centroids: Vec<f64>,
}

/// Whether the history was long enough to leave the warm-up window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Ready,
    /// `bars.len() <= atr_length`: every per-bar value is `None`.
    InsufficientData,
}

/// Complete result of one engine invocation.
///
/// Every per-bar vector has the input length. Results are never mutated
/// after construction; a new invocation produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveResult {
    pub status: ResultStatus,
    /// Candidate factors, ascending.
    pub candidates: Vec<f64>,
    pub states: Vec<Option<AdaptiveState>>,
    pub smoothed: Vec<Option<f64>>,
    pub signals: Vec<SignalEvent>,
}

impl AdaptiveResult {
    /// All-`None` result of the given length.
    pub fn insufficient(bar_count: usize, candidates: Vec<f64>) -> Self {
        Self {
            status: ResultStatus::InsufficientData,
            candidates,
            states: vec![None; bar_count],
            smoothed: vec![None; bar_count],
            signals: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn is_ready(&self) -> bool {
        self.status == ResultStatus::Ready
    }

    pub fn trend_series(&self) -> Vec<Option<Trend>> {
        self.states.iter().map(|s| s.as_ref().map(|s| s.trend)).collect()
    }

    pub fn band_series(&self) -> Vec<Option<f64>> {
        self.states.iter().map(|s| s.as_ref().map(|s| s.band)).collect()
    }

    pub fn factor_series(&self) -> Vec<Option<f64>> {
        self.states
            .iter()
            .map(|s| s.as_ref().map(|s| s.selected_factor))
            .collect()
    }

    pub fn cluster_index_series(&self) -> Vec<Option<usize>> {
        self.states
            .iter()
            .map(|s| s.as_ref().map(|s| s.cluster_index))
            .collect()
    }

    pub fn performance_series(&self) -> Vec<Option<f64>> {
        self.states
            .iter()
            .map(|s| s.as_ref().map(|s| s.performance_metric))
            .collect()
    }

    /// Index of the first defined bar.
    pub fn first_defined(&self) -> Option<usize> {
        self.states.iter().position(Option::is_some)
    }
}
