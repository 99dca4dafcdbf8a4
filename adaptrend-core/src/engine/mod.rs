//! The adaptive engine: one pure batch transform over a bar history.
//!
//! Stages, in order:
//!
//! 1. ATR over the whole history
//! 2. Per-factor band bank → trend signs per candidate
//! 3. Performance tracker → score table
//! 4. Per-bar clustering (independent across bars, fanned out with rayon)
//! 5. Per-bar factor selection
//! 6. Adaptive band fold (strictly sequential)
//! 7. Smoother and flip detection
//!
//! Nothing survives between invocations. The only side effects are
//! `tracing` events.

pub mod cancel;
pub mod state;

pub use cancel::CancelToken;
pub use state::{AdaptiveResult, AdaptiveState, ResultStatus};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::assembler::assemble;
use crate::clustering::{ClusterSet, ClusteringStrategy, KMeans};
use crate::config::{ConfigError, EngineConfig};
use crate::domain::Bar;
use crate::factor_bank::{band_bank_signs, candidates};
use crate::indicators::{Atr, Indicator};
use crate::performance::PerformanceTable;
use crate::selector::{select_factor, Selection};
use crate::signals::detect_flips;
use crate::smoother::smooth;

/// Errors from an engine invocation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("computation cancelled")]
    Cancelled,
}

/// A validated engine, ready to run on any number of histories.
pub struct AdaptiveEngine {
    config: EngineConfig,
    factors: Vec<f64>,
    clusterer: Box<dyn ClusteringStrategy>,
    parallel: bool,
}

impl std::fmt::Debug for AdaptiveEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveEngine")
            .field("config", &self.config)
            .field("factors", &self.factors)
            .field("clusterer", &self.clusterer.name())
            .field("parallel", &self.parallel)
            .finish()
    }
}

impl AdaptiveEngine {
    /// Validate `config` and build the candidate bank.
    ///
    /// Clustering defaults to k-means with the config's iteration, restart
    /// and seed settings; per-bar clustering runs in parallel.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let factors = candidates(config.factor_min, config.factor_max, config.factor_step);
        let clusterer = Box::new(KMeans::new(
            config.max_iterations,
            config.num_runs,
            config.seed,
        ));
        Ok(Self {
            config,
            factors,
            clusterer,
            parallel: true,
        })
    }

    /// Replace the clustering strategy.
    pub fn with_clusterer(mut self, clusterer: Box<dyn ClusteringStrategy>) -> Self {
        self.clusterer = clusterer;
        self
    }

    /// Enable or disable parallel per-bar clustering. Output is identical
    /// either way.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn candidates(&self) -> &[f64] {
        &self.factors
    }

    /// Run over `bars`. Never fails once the engine is built.
    pub fn run(&self, bars: &[Bar]) -> AdaptiveResult {
        match self.run_with_cancel(bars, &CancelToken::new()) {
            Ok(result) => result,
            // A token nobody else holds cannot be cancelled.
            Err(_) => AdaptiveResult::insufficient(bars.len(), self.factors.clone()),
        }
    }

    /// Run over `bars`, polling `cancel`. A cancelled run yields
    /// `EngineError::Cancelled` and no partial result.
    pub fn run_with_cancel(
        &self,
        bars: &[Bar],
        cancel: &CancelToken,
    ) -> Result<AdaptiveResult, EngineError> {
        let n = bars.len();
        let warmup = self.config.atr_length;

        if n <= warmup {
            debug!(bars = n, atr_length = warmup, "insufficient data for adaptive band");
            return Ok(AdaptiveResult::insufficient(n, self.factors.clone()));
        }

        let atr = Atr::new(warmup).compute(bars);
        let signs = band_bank_signs(bars, &atr, &self.factors);
        let performance =
            PerformanceTable::compute(bars, &signs, self.config.performance_memory);
        check(cancel)?;

        let cluster_sets = self.cluster_all(&performance, warmup, n, cancel)?;
        check(cancel)?;

        let mut selections: Vec<Option<Selection>> = vec![None; n];
        for (offset, set) in cluster_sets.iter().enumerate() {
            let i = warmup + offset;
            selections[i] = Some(select_factor(
                set,
                self.config.target_cluster,
                &self.factors,
                performance.scores_at(i),
                performance.normaliser_at(i),
            ));
        }

        let factor_series: Vec<Option<f64>> =
            selections.iter().map(|s| s.map(|s| s.factor)).collect();
        let assembled = assemble(bars, &atr, &factor_series);

        let states: Vec<Option<AdaptiveState>> = assembled
            .iter()
            .zip(&selections)
            .enumerate()
            .map(|(i, (bar, selection))| match (bar, selection) {
                (Some(bar), Some(sel)) => Some(AdaptiveState {
                    trend: bar.trend,
                    band: bar.band,
                    upper: bar.bands.upper,
                    lower: bar.bands.lower,
                    selected_factor: sel.factor,
                    cluster_index: sel.cluster_index,
                    performance_metric: sel.performance_metric,
                    centroids: cluster_sets[i - warmup].centroids(),
                }),
                _ => None,
            })
            .collect();

        let bands: Vec<Option<f64>> = states.iter().map(|s| s.as_ref().map(|s| s.band)).collect();
        let smoothed = smooth(&bands, self.config.adaptive_ma_length);

        let trends: Vec<_> = states.iter().map(|s| s.as_ref().map(|s| s.trend)).collect();
        let metrics: Vec<_> = states
            .iter()
            .map(|s| s.as_ref().map(|s| s.performance_metric))
            .collect();
        let signals = detect_flips(bars, &trends, &metrics);

        info!(
            bars = n,
            candidates = self.factors.len(),
            clusterer = self.clusterer.name(),
            signals = signals.len(),
            "adaptive band computed"
        );

        Ok(AdaptiveResult {
            status: ResultStatus::Ready,
            candidates: self.factors.clone(),
            states,
            smoothed,
            signals,
        })
    }

    /// Cluster every post-warm-up bar. `result[j]` belongs to bar `start + j`.
    fn cluster_all(
        &self,
        performance: &PerformanceTable,
        start: usize,
        end: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<ClusterSet>, EngineError> {
        let k = self.config.num_clusters;
        let cluster_bar = |i: usize| -> Option<ClusterSet> {
            if cancel.is_cancelled() {
                return None;
            }
            Some(self.clusterer.cluster(performance.scores_at(i), k, i))
        };

        let sets: Option<Vec<ClusterSet>> = if self.parallel {
            (start..end).into_par_iter().map(cluster_bar).collect()
        } else {
            (start..end).map(cluster_bar).collect()
        };

        sets.ok_or(EngineError::Cancelled)
    }
}

fn check(cancel: &CancelToken) -> Result<(), EngineError> {
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    Ok(())
}

/// Validate `config` and run the engine over `bars`.
pub fn compute(bars: &[Bar], config: &EngineConfig) -> Result<AdaptiveResult, EngineError> {
    Ok(AdaptiveEngine::new(config.clone())?.run(bars))
}

/// Like [`compute`], but cooperatively cancellable.
pub fn compute_with_cancel(
    bars: &[Bar],
    config: &EngineConfig,
    cancel: &CancelToken,
) -> Result<AdaptiveResult, EngineError> {
    AdaptiveEngine::new(config.clone())?.run_with_cancel(bars, cancel)
}
