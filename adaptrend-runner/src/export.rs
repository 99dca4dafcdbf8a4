//! Result export: per-bar CSV and signal JSON.
//!
//! CSV columns: timestamp, close, trend, band, upper, lower, factor, cluster,
//! performance, smoothed. Warm-up bars keep their timestamp and close; every
//! adaptive column is left empty.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};

use adaptrend_core::{AdaptiveResult, Bar, SignalEvent, Trend};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const HEADER: [&str; 10] = [
    "timestamp",
    "close",
    "trend",
    "band",
    "upper",
    "lower",
    "factor",
    "cluster",
    "performance",
    "smoothed",
];

fn trend_label(trend: Trend) -> &'static str {
    match trend {
        Trend::Bullish => "bullish",
        Trend::Bearish => "bearish",
    }
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Render the per-bar series as CSV.
pub fn export_bars_csv(bars: &[Bar], result: &AdaptiveResult) -> Result<String> {
    ensure!(
        bars.len() == result.len(),
        "result covers {} bars but {} were given",
        result.len(),
        bars.len()
    );

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(HEADER)?;

    for ((bar, state), smoothed) in bars.iter().zip(&result.states).zip(&result.smoothed) {
        let timestamp = bar.timestamp.format(TIMESTAMP_FORMAT).to_string();
        let close = format!("{:.6}", bar.close);
        match state {
            Some(s) => wtr.write_record([
                timestamp,
                close,
                trend_label(s.trend).to_string(),
                format!("{:.6}", s.band),
                format!("{:.6}", s.upper),
                format!("{:.6}", s.lower),
                format!("{:.6}", s.selected_factor),
                s.cluster_index.to_string(),
                format!("{:.6}", s.performance_metric),
                opt(*smoothed),
            ])?,
            None => wtr.write_record([
                timestamp,
                close,
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                opt(*smoothed),
            ])?,
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not UTF-8")
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize signal events to pretty JSON.
pub fn export_signals_json(signals: &[SignalEvent]) -> Result<String> {
    serde_json::to_string_pretty(signals).context("failed to serialize signals to JSON")
}

/// Serialize the full result to pretty JSON.
pub fn export_result_json(result: &AdaptiveResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize result to JSON")
}

// ─── Files ──────────────────────────────────────────────────────────

/// Paths written by [`write_outputs`].
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub bars_csv: PathBuf,
    pub signals_json: PathBuf,
    pub result_json: PathBuf,
}

/// Write `<stem>_bars.csv`, `<stem>_signals.json` and `<stem>_result.json`
/// into `dir`, creating it if needed.
pub fn write_outputs(
    dir: impl AsRef<Path>,
    stem: &str,
    bars: &[Bar],
    result: &AdaptiveResult,
) -> Result<OutputPaths> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let bars_csv = dir.join(format!("{stem}_bars.csv"));
    std::fs::write(&bars_csv, export_bars_csv(bars, result)?)
        .with_context(|| format!("failed to write {}", bars_csv.display()))?;

    let signals_json = dir.join(format!("{stem}_signals.json"));
    std::fs::write(&signals_json, export_signals_json(&result.signals)?)
        .with_context(|| format!("failed to write {}", signals_json.display()))?;

    let result_json = dir.join(format!("{stem}_result.json"));
    std::fs::write(&result_json, export_result_json(result)?)
        .with_context(|| format!("failed to write {}", result_json.display()))?;

    Ok(OutputPaths {
        bars_csv,
        signals_json,
        result_json,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyntheticConfig;
    use crate::data_loader::generate_synthetic_bars;
    use adaptrend_core::{compute, Direction, EngineConfig};

    fn sample() -> (Vec<Bar>, AdaptiveResult) {
        let bars = generate_synthetic_bars(&SyntheticConfig {
            bars: 120,
            seed: 5,
            start_price: 100.0,
        });
        let result = compute(&bars, &EngineConfig::default()).unwrap();
        (bars, result)
    }

    #[test]
    fn csv_has_header_and_one_row_per_bar() {
        let (bars, result) = sample();
        let csv = export_bars_csv(&bars, &result).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 121);
        assert_eq!(
            lines[0],
            "timestamp,close,trend,band,upper,lower,factor,cluster,performance,smoothed"
        );
        // Warm-up rows carry only timestamp and close.
        assert!(lines[1].ends_with(",,,,,,,,"));
        let defined: Vec<&str> = lines[11].split(',').collect();
        assert_eq!(defined.len(), 10);
        assert!(defined[2] == "bullish" || defined[2] == "bearish");
        assert!(defined.iter().all(|f| !f.is_empty()));
    }

    #[test]
    fn length_mismatch_rejected() {
        let (bars, result) = sample();
        assert!(export_bars_csv(&bars[..10], &result).is_err());
    }

    #[test]
    fn signals_json_round_trips() {
        let (_, result) = sample();
        let json = export_signals_json(&result.signals).unwrap();
        let back: Vec<SignalEvent> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result.signals);
        if let Some(first) = back.first() {
            assert!(matches!(first.direction, Direction::Buy | Direction::Sell));
        }
    }

    #[test]
    fn writes_both_files() {
        let (bars, result) = sample();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let paths = write_outputs(&out, "synth", &bars, &result).unwrap();

        assert!(paths.bars_csv.ends_with("synth_bars.csv"));
        let csv = std::fs::read_to_string(&paths.bars_csv).unwrap();
        assert_eq!(csv.lines().count(), 121);
        let json = std::fs::read_to_string(&paths.signals_json).unwrap();
        assert!(json.trim_start().starts_with('['));
        assert!(paths.result_json.ends_with("synth_result.json"));
        assert!(paths.result_json.exists());
    }

    #[test]
    fn result_json_carries_every_bar() {
        let (bars, result) = sample();
        let json = export_result_json(&result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["status"], "ready");
        assert_eq!(value["states"].as_array().unwrap().len(), bars.len());
        assert_eq!(value["smoothed"].as_array().unwrap().len(), bars.len());
        assert_eq!(
            value["signals"].as_array().unwrap().len(),
            result.signals.len()
        );
        assert_eq!(value["candidates"].as_array().unwrap().len(), 9);
    }
}
