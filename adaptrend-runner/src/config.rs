//! Serializable run configuration: where the bars come from and how the
//! engine is tuned.
//!
//! ```toml
//! [data]
//! symbol = "SPY"
//! timeframe = "1d"
//! csv = "data/spy.csv"
//!
//! [engine]
//! atr_length = 10
//! target_cluster = "best"
//! ```
//!
//! A synthetic history replaces `csv` with a `[data.synthetic]` table.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use adaptrend_core::{Bar, ConfigError, EngineConfig};

use crate::cache::CacheKey;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

/// Errors reading or validating a run configuration.
#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("[data] needs either `csv` or `[data.synthetic]`")]
    MissingSource,
    #[error("[data] sets both `csv` and `[data.synthetic]`")]
    AmbiguousSource,
    #[error("synthetic data: {0}")]
    Synthetic(String),
    #[error(transparent)]
    Engine(#[from] ConfigError),
}

/// Complete configuration of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Identity and source of the bar history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub symbol: String,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthetic: Option<SyntheticConfig>,
}

/// Parameters of a generated random-walk history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub bars: usize,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_start_price")]
    pub start_price: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            bars: 500,
            seed: 0,
            start_price: default_start_price(),
        }
    }
}

/// Resolved bar source.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource<'a> {
    Csv(&'a Path),
    Synthetic(&'a SyntheticConfig),
}

fn default_timeframe() -> String {
    "1d".to_string()
}

fn default_start_price() -> f64 {
    100.0
}

impl DataConfig {
    /// The single configured source.
    pub fn source(&self) -> Result<DataSource<'_>, RunConfigError> {
        match (&self.csv, &self.synthetic) {
            (Some(path), None) => Ok(DataSource::Csv(path)),
            (None, Some(synthetic)) => Ok(DataSource::Synthetic(synthetic)),
            (None, None) => Err(RunConfigError::MissingSource),
            (Some(_), Some(_)) => Err(RunConfigError::AmbiguousSource),
        }
    }
}

impl RunConfig {
    /// A synthetic run with default engine settings.
    pub fn synthetic(symbol: impl Into<String>, synthetic: SyntheticConfig) -> Self {
        Self {
            data: DataConfig {
                symbol: symbol.into(),
                timeframe: default_timeframe(),
                csv: None,
                synthetic: Some(synthetic),
            },
            engine: EngineConfig::default(),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, RunConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file. Relative CSV paths resolve
    /// against the config file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RunConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;
        if let (Some(csv), Some(dir)) = (&config.data.csv, path.parent()) {
            if csv.is_relative() {
                config.data.csv = Some(dir.join(csv));
            }
        }
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, RunConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), RunConfigError> {
        if let DataSource::Synthetic(s) = self.data.source()? {
            if s.bars == 0 {
                return Err(RunConfigError::Synthetic("bars must be >= 1".into()));
            }
            if !s.start_price.is_finite() || s.start_price <= 0.0 {
                return Err(RunConfigError::Synthetic(format!(
                    "start_price must be a positive number (got {})",
                    s.start_price
                )));
            }
        }
        self.engine.validate()?;
        Ok(())
    }

    /// Deterministic hash of the whole run configuration.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Cache key for a loaded history.
    pub fn cache_key(&self, bars: &[Bar]) -> CacheKey {
        CacheKey::new(&self.data.symbol, &self.data.timeframe, bars, &self.engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaptrend_core::TargetCluster;

    const CSV_CONFIG: &str = r#"
[data]
symbol = "SPY"
timeframe = "1h"
csv = "bars/spy.csv"

[engine]
atr_length = 14
target_cluster = "middle"
"#;

    #[test]
    fn parses_csv_config_with_partial_engine() {
        let config = RunConfig::from_toml(CSV_CONFIG).unwrap();
        assert_eq!(config.data.symbol, "SPY");
        assert_eq!(config.data.timeframe, "1h");
        assert_eq!(
            config.data.source().unwrap(),
            DataSource::Csv(Path::new("bars/spy.csv"))
        );
        assert_eq!(config.engine.atr_length, 14);
        assert_eq!(config.engine.target_cluster, TargetCluster::Middle);
        assert_eq!(config.engine.num_clusters, 3);
    }

    #[test]
    fn parses_synthetic_config_with_defaults() {
        let config = RunConfig::from_toml(
            r#"
[data]
symbol = "SYNTH"

[data.synthetic]
bars = 300
seed = 9
"#,
        )
        .unwrap();
        assert_eq!(config.data.timeframe, "1d");
        assert_eq!(config.engine, EngineConfig::default());
        let DataSource::Synthetic(s) = config.data.source().unwrap() else {
            panic!("expected synthetic source");
        };
        assert_eq!(s.bars, 300);
        assert_eq!(s.seed, 9);
        assert_eq!(s.start_price, 100.0);
    }

    #[test]
    fn toml_round_trip() {
        let config = RunConfig::from_toml(CSV_CONFIG).unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(RunConfig::from_toml(&text).unwrap(), config);

        let synthetic = RunConfig::synthetic("X", SyntheticConfig::default());
        let text = synthetic.to_toml().unwrap();
        assert_eq!(RunConfig::from_toml(&text).unwrap(), synthetic);
    }

    #[test]
    fn missing_or_double_source_rejected() {
        let none = "[data]\nsymbol = \"A\"\n";
        assert!(matches!(
            RunConfig::from_toml(none),
            Err(RunConfigError::MissingSource)
        ));

        let both = "[data]\nsymbol = \"A\"\ncsv = \"a.csv\"\n[data.synthetic]\nbars = 10\n";
        assert!(matches!(
            RunConfig::from_toml(both),
            Err(RunConfigError::AmbiguousSource)
        ));
    }

    #[test]
    fn invalid_engine_section_rejected() {
        let text = "[data]\nsymbol = \"A\"\ncsv = \"a.csv\"\n[engine]\nfactor_step = 0.0\n";
        assert!(matches!(
            RunConfig::from_toml(text),
            Err(RunConfigError::Engine(ConfigError::FactorStep(_)))
        ));
    }

    #[test]
    fn zero_synthetic_bars_rejected() {
        let config = RunConfig::synthetic(
            "X",
            SyntheticConfig {
                bars: 0,
                ..SyntheticConfig::default()
            },
        );
        assert!(matches!(
            config.validate(),
            Err(RunConfigError::Synthetic(_))
        ));
    }

    #[test]
    fn run_id_deterministic_and_sensitive() {
        let a = RunConfig::from_toml(CSV_CONFIG).unwrap();
        let mut b = a.clone();
        assert_eq!(a.run_id(), b.run_id());
        b.engine.seed += 1;
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn relative_csv_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(&path, CSV_CONFIG).unwrap();

        let config = RunConfig::from_file(&path).unwrap();
        assert_eq!(config.data.csv, Some(dir.path().join("bars/spy.csv")));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = RunConfig::from_file("/nonexistent/run.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/run.toml"));
    }
}
