//! Adaptrend Runner: orchestration around the adaptive engine.
//!
//! This crate builds on `adaptrend-core` to provide:
//! - TOML run configuration (data source + engine settings)
//! - CSV and synthetic bar loading with input validation
//! - A bounded, injected result cache
//! - A background worker with cooperative cancellation
//! - Per-bar CSV and signal JSON export

pub mod cache;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod worker;

pub use cache::{bars_hash, CacheKey, ResultCache};
pub use config::{DataConfig, DataSource, RunConfig, RunConfigError, RunId, SyntheticConfig};
pub use data_loader::{generate_synthetic_bars, load_bars, load_csv, read_csv, LoadError};
pub use export::{
    export_bars_csv, export_result_json, export_signals_json, write_outputs, OutputPaths,
};
pub use runner::{run_from_config, run_from_file, run_on_bars, RunError, RunOutput, RunSummary};
pub use worker::{spawn_worker, ComputeRequest, WorkerCommand, WorkerHandle, WorkerResponse};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn cache_is_send_sync() {
        assert_send::<ResultCache>();
        assert_sync::<ResultCache>();
    }

    #[test]
    fn worker_messages_are_send() {
        assert_send::<WorkerCommand>();
        assert_send::<WorkerResponse>();
        assert_send::<RunOutput>();
    }
}
