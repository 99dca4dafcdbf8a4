//! Engine configuration and its validation.
//!
//! Validation happens once, before any bar is touched. A config that passes
//! `validate()` can never make the engine fail mid-series.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected configuration. No partial result is ever produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("atr_length must be >= 1")]
    AtrLength,
    #[error("factor bounds must be finite (min={min}, max={max}, step={step})")]
    NonFiniteFactor { min: f64, max: f64, step: f64 },
    #[error("factor_min ({min}) must not exceed factor_max ({max})")]
    FactorRange { min: f64, max: f64 },
    #[error("factor_step must be > 0 (got {0})")]
    FactorStep(f64),
    #[error("num_clusters must be >= 1")]
    NumClusters,
    #[error("{candidates} candidate factors cannot fill {clusters} clusters")]
    TooFewCandidates { candidates: usize, clusters: usize },
    #[error("factor range {min}..={max} by {step} exceeds {max_candidates} candidates")]
    TooManyCandidates {
        min: f64,
        max: f64,
        step: f64,
        max_candidates: usize,
    },
    #[error("num_runs must be >= 1")]
    NumRuns,
    #[error("max_iterations must be >= 1")]
    MaxIterations,
    #[error("performance_memory must lie in [0, 1] (got {0})")]
    PerformanceMemory(f64),
}

/// Which cluster of the per-bar partition feeds the factor selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetCluster {
    /// Highest centroid.
    #[default]
    Best,
    /// Cluster at index `k / 2`.
    Middle,
    /// Lowest centroid.
    Worst,
}

impl TargetCluster {
    /// Index into a centroid-sorted list of `k` clusters.
    pub fn index(self, k: usize) -> usize {
        match self {
            TargetCluster::Best => k.saturating_sub(1),
            TargetCluster::Middle => k / 2,
            TargetCluster::Worst => 0,
        }
    }
}

/// Complete configuration of one engine invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub atr_length: usize,
    pub factor_min: f64,
    pub factor_max: f64,
    pub factor_step: f64,
    /// EMA constant α of the performance tracker.
    pub performance_memory: f64,
    pub num_clusters: usize,
    pub target_cluster: TargetCluster,
    pub max_iterations: usize,
    pub num_runs: usize,
    /// Smoother window; 0 disables the smoothed line.
    pub adaptive_ma_length: usize,
    /// Master seed for k-means restart initialisation.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            atr_length: 10,
            factor_min: 1.0,
            factor_max: 5.0,
            factor_step: 0.5,
            performance_memory: 2.0 / 11.0,
            num_clusters: 3,
            target_cluster: TargetCluster::Best,
            max_iterations: 1000,
            num_runs: 5,
            adaptive_ma_length: 10,
            seed: 42,
        }
    }
}

impl EngineConfig {
    /// Reject every configuration the engine cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.atr_length < 1 {
            return Err(ConfigError::AtrLength);
        }
        if !(self.factor_min.is_finite()
            && self.factor_max.is_finite()
            && self.factor_step.is_finite())
        {
            return Err(ConfigError::NonFiniteFactor {
                min: self.factor_min,
                max: self.factor_max,
                step: self.factor_step,
            });
        }
        if self.factor_min > self.factor_max {
            return Err(ConfigError::FactorRange {
                min: self.factor_min,
                max: self.factor_max,
            });
        }
        if self.factor_step <= 0.0 {
            return Err(ConfigError::FactorStep(self.factor_step));
        }
        if self.num_clusters < 1 {
            return Err(ConfigError::NumClusters);
        }
        if self.num_runs < 1 {
            return Err(ConfigError::NumRuns);
        }
        if self.max_iterations < 1 {
            return Err(ConfigError::MaxIterations);
        }
        if !(0.0..=1.0).contains(&self.performance_memory) {
            return Err(ConfigError::PerformanceMemory(self.performance_memory));
        }
        let candidates = crate::factor_bank::checked_candidate_count(
            self.factor_min,
            self.factor_max,
            self.factor_step,
        )
        .ok_or(ConfigError::TooManyCandidates {
            min: self.factor_min,
            max: self.factor_max,
            step: self.factor_step,
            max_candidates: crate::factor_bank::MAX_CANDIDATES,
        })?;
        if candidates < self.num_clusters {
            return Err(ConfigError::TooFewCandidates {
                candidates,
                clusters: self.num_clusters,
            });
        }
        Ok(())
    }

    /// Exact identity of this configuration (BLAKE3 over canonical JSON, hex).
    ///
    /// Two configs hash equal iff every field is equal, so results can be
    /// cached under this key.
    pub fn config_hash(&self) -> String {
        // Field order is fixed by the struct, so the JSON is canonical.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
