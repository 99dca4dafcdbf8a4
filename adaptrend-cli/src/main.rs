//! Adaptrend CLI: run the adaptive engine from config files or synthetic data.
//!
//! Commands:
//! - `run`: load bars per a TOML config, compute, export CSV and JSON
//! - `synthetic`: same, on a seeded random-walk history
//! - `hash`: print the engine config hash and run id of a TOML config

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use adaptrend_core::EngineConfig;
use adaptrend_runner::{
    run_from_config, write_outputs, ResultCache, RunConfig, RunOutput, SyntheticConfig,
};

#[derive(Parser)]
#[command(
    name = "adaptrend",
    about = "Adaptrend CLI: adaptive multi-factor trend engine"
)]
struct Cli {
    /// Log more (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine as described by a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for the bar CSV and the JSON files.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run the engine on a generated random-walk history.
    Synthetic {
        /// Number of bars to generate.
        #[arg(long, default_value_t = 500)]
        bars: usize,

        /// Seed for the price walk.
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Opening price of the first bar.
        #[arg(long, default_value_t = 100.0)]
        start_price: f64,

        /// Optional TOML file holding engine settings (an `[engine]` table
        /// or bare keys).
        #[arg(long)]
        engine: Option<PathBuf>,

        /// Output directory for the bar CSV and the JSON files.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the engine config hash and run id of a TOML config file.
    Hash {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            json,
        } => run_cmd(&config, &output_dir, json),
        Commands::Synthetic {
            bars,
            seed,
            start_price,
            engine,
            output_dir,
            json,
        } => synthetic_cmd(bars, seed, start_price, engine.as_deref(), &output_dir, json),
        Commands::Hash { config } => hash_cmd(&config),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_cmd(config_path: &Path, output_dir: &Path, json: bool) -> Result<()> {
    let config = RunConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    execute(&config, output_dir, json)
}

fn synthetic_cmd(
    bars: usize,
    seed: u64,
    start_price: f64,
    engine_path: Option<&Path>,
    output_dir: &Path,
    json: bool,
) -> Result<()> {
    if bars == 0 {
        bail!("--bars must be at least 1");
    }

    let mut config = RunConfig::synthetic(
        format!("SYNTH-{seed}"),
        SyntheticConfig {
            bars,
            seed,
            start_price,
        },
    );
    if let Some(path) = engine_path {
        config.engine = load_engine_config(path)?;
    }
    config.validate()?;
    execute(&config, output_dir, json)
}

/// Accepts either a full run config's `[engine]` table or bare engine keys.
fn load_engine_config(path: &Path) -> Result<EngineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let table: toml::Table = text
        .parse()
        .with_context(|| format!("invalid TOML in {}", path.display()))?;
    let section = match table.get("engine") {
        Some(section) => section.clone(),
        None => toml::Value::Table(table),
    };
    let engine: EngineConfig = section
        .try_into()
        .with_context(|| format!("invalid engine settings in {}", path.display()))?;
    Ok(engine)
}

fn execute(config: &RunConfig, output_dir: &Path, json: bool) -> Result<()> {
    let cache = ResultCache::default();
    let output = run_from_config(config, &cache)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output.summary())?);
    } else {
        print_summary(&output);
    }

    let stem = sanitize(&format!("{}_{}", config.data.symbol, config.data.timeframe));
    let paths = write_outputs(output_dir, &stem, &output.bars, &output.result)?;
    if !json {
        println!("Bars CSV saved to:     {}", paths.bars_csv.display());
        println!("Signals JSON saved to: {}", paths.signals_json.display());
        println!("Result JSON saved to:  {}", paths.result_json.display());
    }
    Ok(())
}

fn hash_cmd(config_path: &Path) -> Result<()> {
    let config = RunConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    println!("config_hash: {}", config.engine.config_hash());
    println!("run_id:      {}", config.run_id());
    Ok(())
}

fn sanitize(stem: &str) -> String {
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn print_summary(output: &RunOutput) {
    let summary = output.summary();
    println!();
    println!("=== Adaptive Trend Result ===");
    println!("Symbol:         {}", summary.symbol);
    println!("Timeframe:      {}", summary.timeframe);
    println!("Bars:           {}", summary.bars);
    println!("Status:         {:?}", summary.status);
    println!("Candidates:     {}", summary.candidates);
    println!("Config hash:    {}", summary.config_hash);
    println!();
    println!("--- Signals ---");
    println!("Buy:            {}", summary.buy_signals);
    println!("Sell:           {}", summary.sell_signals);
    println!();
    println!("--- Last Bar ---");
    match (summary.last_trend, summary.last_band, summary.last_factor) {
        (Some(trend), Some(band), Some(factor)) => {
            println!("Trend:          {trend:?}");
            println!("Band:           {band:.4}");
            println!("Factor:         {factor:.3}");
        }
        _ => println!("(insufficient data)"),
    }
    println!();
    println!(
        "Computed in {:.3}s{}",
        summary.elapsed_secs,
        if summary.cached { " (cached)" } else { "" }
    );
}
