//! Adaptrend Core: adaptive multi-factor trend engine.
//!
//! Given a bar history this crate:
//! - Estimates volatility (Wilder ATR)
//! - Runs one trailing-stop band per candidate multiplier
//! - Tracks each candidate's exponentially smoothed profitability
//! - Clusters the candidates by performance at every bar
//! - Blends the target cluster into one adaptive trailing-stop line
//! - Smooths the line and reports trend flips
//!
//! Entry points: [`engine::compute`] and [`engine::AdaptiveEngine`].

pub mod assembler;
pub mod band;
pub mod clustering;
pub mod config;
pub mod domain;
pub mod engine;
pub mod factor_bank;
pub mod indicators;
pub mod performance;
pub mod rng;
pub mod selector;
pub mod signals;
pub mod smoother;

pub use config::{ConfigError, EngineConfig, TargetCluster};
pub use domain::{Bar, Direction, SignalEvent, Trend};
pub use engine::{
    compute, compute_with_cancel, AdaptiveEngine, AdaptiveResult, AdaptiveState, CancelToken,
    EngineError, ResultStatus,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything handed across threads is Send + Sync.
    ///
    /// Results travel from the runner's worker thread to consumers, and the
    /// engine itself is shared by rayon's clustering fan-out.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Bar>();
        require_sync::<Bar>();
        require_send::<SignalEvent>();
        require_sync::<SignalEvent>();
        require_send::<EngineConfig>();
        require_sync::<EngineConfig>();
        require_send::<AdaptiveResult>();
        require_sync::<AdaptiveResult>();
        require_send::<AdaptiveEngine>();
        require_sync::<AdaptiveEngine>();
        require_send::<CancelToken>();
        require_sync::<CancelToken>();
        require_send::<clustering::KMeans>();
        require_sync::<clustering::KMeans>();
        require_send::<rng::SeedHierarchy>();
        require_sync::<rng::SeedHierarchy>();
    }

    /// Architecture contract: clustering sees scores only, never bars or bands.
    ///
    /// The strategy signature takes `&[f64]`, a cluster count and a bar index.
    /// If it ever grows a bar or band parameter, this stops compiling.
    #[test]
    fn clustering_strategy_sees_scores_only() {
        fn _check_trait_object_builds(
            strategy: &dyn clustering::ClusteringStrategy,
            scores: &[f64],
        ) -> clustering::ClusterSet {
            strategy.cluster(scores, 3, 0)
        }
    }
}
