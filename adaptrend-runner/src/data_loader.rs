//! Bar loading for the runner.
//!
//! Bars come from a CSV file (`timestamp,open,high,low,close`) or from a
//! seeded synthetic random walk. Everything the engine assumes about its
//! input is checked here, before the engine sees a single bar:
//! - at least one bar
//! - finite prices
//! - `high >= low`
//! - strictly increasing timestamps

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use adaptrend_core::Bar;

use crate::config::{DataConfig, DataSource, RunConfigError, SyntheticConfig};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: unrecognised timestamp '{value}'")]
    Timestamp { line: usize, value: String },

    #[error("no bars in input")]
    Empty,

    #[error("line {line}: {reason}")]
    Invalid { line: usize, reason: String },

    #[error(transparent)]
    Config(#[from] RunConfigError),
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

/// Load the bars a data section points at.
pub fn load_bars(data: &DataConfig) -> Result<Vec<Bar>, LoadError> {
    let bars = match data.source()? {
        DataSource::Csv(path) => load_csv(path)?,
        DataSource::Synthetic(synthetic) => generate_synthetic_bars(synthetic),
    };
    info!(
        symbol = %data.symbol,
        timeframe = %data.timeframe,
        bars = bars.len(),
        "bars loaded"
    );
    Ok(bars)
}

/// Read and validate a CSV file.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "reading bars");
    read_csv(file)
}

/// Read and validate CSV bars from any reader.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();

    for (i, row) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = row?;
        // Header is line 1.
        let line = i + 2;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| LoadError::Timestamp {
            line,
            value: row.timestamp.clone(),
        })?;
        bars.push(Bar {
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
        });
    }

    validate_bars(&bars)?;
    Ok(bars)
}

/// Accepts RFC 3339 (converted to UTC), `%Y-%m-%d %H:%M:%S`, `%Y-%m-%dT%H:%M:%S`
/// and plain dates (midnight).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Reject histories the engine must never see.
///
/// Line numbers assume one header line, matching the CSV layout.
pub fn validate_bars(bars: &[Bar]) -> Result<(), LoadError> {
    if bars.is_empty() {
        return Err(LoadError::Empty);
    }

    for (i, bar) in bars.iter().enumerate() {
        let line = i + 2;
        let prices = [bar.open, bar.high, bar.low, bar.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(LoadError::Invalid {
                line,
                reason: "non-finite price".into(),
            });
        }
        if bar.high < bar.low {
            return Err(LoadError::Invalid {
                line,
                reason: format!("high {} below low {}", bar.high, bar.low),
            });
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(LoadError::Invalid {
                line,
                reason: format!(
                    "timestamp {} does not follow {}",
                    bar.timestamp,
                    bars[i - 1].timestamp
                ),
            });
        }
    }

    Ok(())
}

/// Generate a deterministic random-walk history.
///
/// Daily bars from 2020-01-01, multiplicative returns within ±2%, wicks up
/// to 1% beyond the body. The same config always yields the same bars.
pub fn generate_synthetic_bars(config: &SyntheticConfig) -> Vec<Bar> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"adaptrend-synthetic");
    hasher.update(&config.seed.to_le_bytes());
    let seed: [u8; 32] = *hasher.finalize().as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();

    let mut bars = Vec::with_capacity(config.bars);
    let mut price = config.start_price;

    for i in 0..config.bars {
        let daily_return: f64 = rng.gen_range(-0.02..0.02);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));

        bars.push(Bar {
            timestamp: start + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
        });
        price = close;
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = "\
timestamp,open,high,low,close
2024-01-02,100,102,99,101
2024-01-03 00:00:00,101,103,100,102
2024-01-04T00:00:00Z,102,104,101,103
";

    #[test]
    fn reads_mixed_timestamp_formats() {
        let bars = read_csv(GOOD.as_bytes()).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].timestamp.to_string(), "2024-01-02 00:00:00");
        assert_eq!(bars[2].timestamp.to_string(), "2024-01-04 00:00:00");
        assert_eq!(bars[1].close, 102.0);
    }

    #[test]
    fn rfc3339_offsets_convert_to_utc() {
        let ts = parse_timestamp("2024-03-01T09:30:00-05:00").unwrap();
        assert_eq!(ts.to_string(), "2024-03-01 14:30:00");
    }

    #[test]
    fn empty_file_rejected() {
        let err = read_csv("timestamp,open,high,low,close\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Empty));
    }

    #[test]
    fn bad_timestamp_reports_line() {
        let csv = "timestamp,open,high,low,close\n2024-01-02,1,2,0.5,1\nyesterday,1,2,0.5,1\n";
        match read_csv(csv.as_bytes()).unwrap_err() {
            LoadError::Timestamp { line, value } => {
                assert_eq!(line, 3);
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_price_rejected() {
        let csv = "timestamp,open,high,low,close\n2024-01-02,1,NaN,0.5,1\n";
        match read_csv(csv.as_bytes()).unwrap_err() {
            LoadError::Invalid { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("non-finite"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn inverted_range_rejected() {
        let csv = "timestamp,open,high,low,close\n2024-01-02,1,0.5,2,1\n";
        assert!(matches!(
            read_csv(csv.as_bytes()).unwrap_err(),
            LoadError::Invalid { line: 2, .. }
        ));
    }

    #[test]
    fn non_increasing_timestamps_rejected() {
        let csv = "timestamp,open,high,low,close\n\
                   2024-01-03,1,2,0.5,1\n\
                   2024-01-03,1,2,0.5,1\n";
        match read_csv(csv.as_bytes()).unwrap_err() {
            LoadError::Invalid { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("does not follow"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_number_is_csv_error() {
        let csv = "timestamp,open,high,low,close\n2024-01-02,one,2,0.5,1\n";
        assert!(matches!(read_csv(csv.as_bytes()).unwrap_err(), LoadError::Csv(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_csv("/nonexistent/bars.csv").unwrap_err(),
            LoadError::Io { .. }
        ));
    }

    #[test]
    fn synthetic_is_deterministic_and_valid() {
        let config = SyntheticConfig {
            bars: 250,
            seed: 3,
            start_price: 50.0,
        };
        let a = generate_synthetic_bars(&config);
        let b = generate_synthetic_bars(&config);
        assert_eq!(a, b);
        assert_eq!(a.len(), 250);
        assert_eq!(a[0].open, 50.0);
        assert!(validate_bars(&a).is_ok());
        assert!(a.iter().all(Bar::is_sane));

        let other = generate_synthetic_bars(&SyntheticConfig { seed: 4, ..config });
        assert_ne!(a, other);
    }
}
