//! Single-run orchestration: config → bars → cached engine result.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use adaptrend_core::{
    AdaptiveEngine, AdaptiveResult, Bar, Direction, EngineError, ResultStatus, Trend,
};

use crate::cache::{CacheKey, ResultCache};
use crate::config::{RunConfig, RunConfigError};
use crate::data_loader::{load_bars, LoadError};

/// Errors from a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] RunConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub config: RunConfig,
    pub key: CacheKey,
    pub bars: Vec<Bar>,
    pub result: Arc<AdaptiveResult>,
    /// Served from the cache rather than computed.
    pub cached: bool,
    pub elapsed_secs: f64,
}

/// Compact, printable digest of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub symbol: String,
    pub timeframe: String,
    pub bars: usize,
    pub status: ResultStatus,
    pub config_hash: String,
    pub candidates: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub last_trend: Option<Trend>,
    pub last_band: Option<f64>,
    pub last_factor: Option<f64>,
    pub cached: bool,
    pub elapsed_secs: f64,
}

impl RunOutput {
    pub fn summary(&self) -> RunSummary {
        let count = |d: Direction| {
            self.result
                .signals
                .iter()
                .filter(|s| s.direction == d)
                .count()
        };
        let last = self.result.states.last().and_then(Option::as_ref);
        RunSummary {
            symbol: self.key.symbol.clone(),
            timeframe: self.key.timeframe.clone(),
            bars: self.bars.len(),
            status: self.result.status,
            config_hash: self.key.config_hash.clone(),
            candidates: self.result.candidates.len(),
            buy_signals: count(Direction::Buy),
            sell_signals: count(Direction::Sell),
            last_trend: last.map(|s| s.trend),
            last_band: last.map(|s| s.band),
            last_factor: last.map(|s| s.selected_factor),
            cached: self.cached,
            elapsed_secs: self.elapsed_secs,
        }
    }
}

/// Load the configured bars and compute (or fetch) the adaptive result.
pub fn run_from_config(config: &RunConfig, cache: &ResultCache) -> Result<RunOutput, RunError> {
    config.validate()?;
    let bars = load_bars(&config.data)?;
    run_on_bars(config, bars, cache)
}

/// Read a TOML config file and run it.
pub fn run_from_file(path: impl AsRef<Path>, cache: &ResultCache) -> Result<RunOutput, RunError> {
    let config = RunConfig::from_file(path)?;
    run_from_config(&config, cache)
}

/// Compute on already-loaded bars, consulting `cache` first.
pub fn run_on_bars(
    config: &RunConfig,
    bars: Vec<Bar>,
    cache: &ResultCache,
) -> Result<RunOutput, RunError> {
    let start = Instant::now();
    let key = config.cache_key(&bars);

    if let Some(result) = cache.get(&key) {
        debug!(key = %key, "cache hit");
        return Ok(RunOutput {
            config: config.clone(),
            key,
            bars,
            result,
            cached: true,
            elapsed_secs: start.elapsed().as_secs_f64(),
        });
    }

    let engine = AdaptiveEngine::new(config.engine.clone()).map_err(EngineError::from)?;
    let result = Arc::new(engine.run(&bars));
    cache.put(key.clone(), Arc::clone(&result));

    let elapsed_secs = start.elapsed().as_secs_f64();
    info!(
        key = %key,
        signals = result.signals.len(),
        elapsed_secs,
        "run complete"
    );

    Ok(RunOutput {
        config: config.clone(),
        key,
        bars,
        result,
        cached: false,
        elapsed_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyntheticConfig;

    fn synthetic(bars: usize) -> RunConfig {
        RunConfig::synthetic(
            "SYNTH",
            SyntheticConfig {
                bars,
                seed: 1,
                start_price: 100.0,
            },
        )
    }

    #[test]
    fn second_run_hits_cache() {
        let cache = ResultCache::new(4);
        let config = synthetic(200);

        let first = run_from_config(&config, &cache).unwrap();
        assert!(!first.cached);
        assert_eq!(first.result.len(), 200);

        let second = run_from_config(&config, &cache).unwrap();
        assert!(second.cached);
        assert!(Arc::ptr_eq(&first.result, &second.result));
    }

    #[test]
    fn engine_change_misses_cache() {
        let cache = ResultCache::new(4);
        let config = synthetic(150);
        run_from_config(&config, &cache).unwrap();

        let mut tuned = config.clone();
        tuned.engine.num_runs = 2;
        let out = run_from_config(&tuned, &cache).unwrap();
        assert!(!out.cached);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn different_synthetic_seed_misses_cache() {
        let cache = ResultCache::new(4);
        let a = RunConfig::synthetic(
            "X",
            SyntheticConfig {
                bars: 200,
                seed: 1,
                start_price: 100.0,
            },
        );
        let mut b = a.clone();
        if let Some(synthetic) = b.data.synthetic.as_mut() {
            synthetic.seed = 2;
        }

        let first = run_from_config(&a, &cache).unwrap();
        let second = run_from_config(&b, &cache).unwrap();
        assert!(!first.cached);
        assert!(!second.cached);
        assert!(!Arc::ptr_eq(&first.result, &second.result));
        assert_eq!(cache.len(), 2);

        let fresh = adaptrend_core::compute(&second.bars, &b.engine).unwrap();
        assert_eq!(*second.result, fresh);
    }

    #[test]
    fn different_start_price_misses_cache() {
        let cache = ResultCache::new(4);
        let a = synthetic(120);
        let mut b = a.clone();
        if let Some(synthetic) = b.data.synthetic.as_mut() {
            synthetic.start_price = 250.0;
        }

        let first = run_from_config(&a, &cache).unwrap();
        let out = run_from_config(&b, &cache).unwrap();
        assert!(!out.cached);
        assert_eq!(first.key.bar_count, out.key.bar_count);
        assert_ne!(first.key, out.key);
    }

    #[test]
    fn short_history_reports_insufficient_data() {
        let cache = ResultCache::default();
        let out = run_from_config(&synthetic(5), &cache).unwrap();
        let summary = out.summary();
        assert_eq!(summary.status, ResultStatus::InsufficientData);
        assert_eq!(summary.last_trend, None);
        assert_eq!(summary.buy_signals + summary.sell_signals, 0);
    }

    #[test]
    fn summary_counts_signals() {
        let cache = ResultCache::default();
        let out = run_from_config(&synthetic(400), &cache).unwrap();
        let summary = out.summary();
        assert_eq!(summary.bars, 400);
        assert_eq!(summary.candidates, 9);
        assert_eq!(
            summary.buy_signals + summary.sell_signals,
            out.result.signals.len()
        );
        assert!(summary.last_trend.is_some());
    }

    #[test]
    fn invalid_engine_config_is_config_error() {
        let mut config = synthetic(50);
        config.engine.num_clusters = 0;
        let err = run_from_config(&config, &ResultCache::default()).unwrap_err();
        assert!(matches!(err, RunError::Config(RunConfigError::Engine(_))));
    }
}
