//! Folio CLI — run, sweep, and synthetic-data commands.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file and save artifacts
//! - `sweep` — run a parameter grid over one loaded dataset
//! - `synth` — write a seeded synthetic dataset as CSV or Parquet

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use folio_core::cost::CostModelConfig;
use folio_core::data::FeatureWindows;
use folio_core::strategy::WeightingScheme;
use folio_runner::data_loader::{generate_synthetic, write_parquet};
use folio_runner::export::{export_dataset_csv, export_json, export_sweep_csv};
use folio_runner::{
    load_dataset, run_backtest, save_artifacts, BacktestConfig, BacktestResult, ParamGrid,
    ParamSweep,
};

#[derive(Parser)]
#[command(name = "folio", about = "Folio CLI — portfolio backtest simulator")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for result.json, series.csv, and ledger.csv.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the full result as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run a parameter grid. Axes left empty keep the config's value.
    Sweep {
        /// Path to the base TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Leverage limits, comma separated (e.g. 0.25,0.5,1.0).
        #[arg(long, value_delimiter = ',')]
        leverage: Vec<f64>,

        /// Top-N selection sizes, comma separated.
        #[arg(long, value_delimiter = ',')]
        top_n: Vec<usize>,

        /// Weighting schemes, comma separated: rank, uniform, risk_parity.
        #[arg(long, value_delimiter = ',')]
        weighting: Vec<String>,

        /// Fixed-rate cost models to try, comma separated fee rates.
        #[arg(long, value_delimiter = ',')]
        fee_rate: Vec<f64>,

        /// Run grid points one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Write the ranked summary table here as CSV.
        #[arg(long)]
        output: Option<PathBuf>,

        /// How many of the best points to print.
        #[arg(long, default_value_t = 10)]
        show: usize,
    },
    /// Generate a seeded synthetic dataset.
    Synth {
        /// Symbols to generate (e.g. AAA BBB CCC).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD).
        #[arg(long)]
        end: String,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Output file; `.parquet` writes Parquet, anything else CSV.
        #[arg(long)]
        output: PathBuf,

        #[arg(long, default_value_t = 180)]
        volatility_window: usize,

        #[arg(long, default_value_t = 60)]
        score_window: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            json,
        } => run_cmd(&config, &output_dir, json),
        Commands::Sweep {
            config,
            leverage,
            top_n,
            weighting,
            fee_rate,
            sequential,
            output,
            show,
        } => sweep_cmd(
            &config,
            leverage,
            top_n,
            &weighting,
            fee_rate,
            sequential,
            output.as_deref(),
            show,
        ),
        Commands::Synth {
            symbols,
            start,
            end,
            seed,
            output,
            volatility_window,
            score_window,
        } => synth_cmd(
            &symbols,
            &start,
            &end,
            seed,
            &output,
            FeatureWindows {
                volatility: volatility_window,
                score: score_window,
            },
        ),
    }
}

fn init_logging(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {e}"))
}

fn run_cmd(config_path: &Path, output_dir: &Path, json: bool) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let result = run_backtest(&config)?;

    if json {
        println!("{}", export_json(&result)?);
    } else {
        print_summary(&result);
    }

    let run_dir = save_artifacts(&result, output_dir)?;
    info!(dir = %run_dir.display(), "artifacts saved");
    if !json {
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn sweep_cmd(
    config_path: &Path,
    leverage: Vec<f64>,
    top_n: Vec<usize>,
    weighting: &[String],
    fee_rate: Vec<f64>,
    sequential: bool,
    output: Option<&Path>,
    show: usize,
) -> Result<()> {
    let base = BacktestConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if base.strategy.schedule.is_some() {
        bail!("sweep needs a strategy-driven config; remove strategy.schedule");
    }

    let weightings = weighting
        .iter()
        .map(|w| w.parse::<WeightingScheme>())
        .collect::<Result<Vec<_>, _>>()?;
    let grid = ParamGrid {
        leverage_limits: leverage,
        top_ns: top_n,
        weightings,
        cost_models: fee_rate
            .into_iter()
            .map(|fee_rate| CostModelConfig::FixedRate { fee_rate })
            .collect(),
    };

    let loaded = load_dataset(
        &base.data,
        base.backtest.start_date,
        base.backtest.end_date,
    )?;
    println!("Sweeping {} configurations...", grid.size());
    let results = ParamSweep::new()
        .with_parallelism(!sequential)
        .sweep(&grid, &base, &loaded)?;

    println!();
    println!(
        "{:<12} {:<12} {:>6} {:>8} {:<20} {:>8} {:>8} {:>8}",
        "Run", "Weighting", "TopN", "Lev", "Cost", "Sharpe", "CAGR", "MaxDD"
    );
    println!("{}", "-".repeat(90));
    for r in results.top_n(show) {
        println!(
            "{:<12} {:<12} {:>6} {:>8.2} {:<20} {:>8.3} {:>7.2}% {:>7.2}%",
            r.run_id.get(..12).unwrap_or(&r.run_id),
            r.strategy.weighting,
            r.strategy.top_n.map(|n| n.to_string()).unwrap_or_default(),
            r.strategy.leverage_limit,
            r.cost_model,
            r.metrics.sharpe,
            r.metrics.cagr * 100.0,
            r.metrics.max_drawdown * 100.0,
        );
    }

    if let Some(path) = output {
        std::fs::write(path, export_sweep_csv(&results)?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Summary written to: {}", path.display());
    }
    Ok(())
}

fn synth_cmd(
    symbols: &[String],
    start: &str,
    end: &str,
    seed: u64,
    output: &Path,
    windows: FeatureWindows,
) -> Result<()> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")?;
    let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")?;
    if start > end {
        bail!("--start {start} is after --end {end}");
    }

    let dataset = generate_synthetic(symbols, start, end, seed, &windows)?;
    let is_parquet = output.extension().and_then(|e| e.to_str()) == Some("parquet");
    if is_parquet {
        write_parquet(&dataset, output)?;
    } else {
        std::fs::write(output, export_dataset_csv(&dataset)?)
            .with_context(|| format!("writing {}", output.display()))?;
    }

    println!(
        "Wrote {} records ({} symbols × {} dates) to {}",
        dataset.record_count(),
        dataset.symbol_count(),
        dataset.date_count(),
        output.display()
    );
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!("Run:            {}", result.run_id);
    println!("Period:         {} to {}", result.start_date, result.end_date);
    if result.has_synthetic {
        println!("Data:           SYNTHETIC ({} symbols)", result.symbol_count);
    } else {
        println!("Data:           {} symbols", result.symbol_count);
    }
    println!(
        "Strategy:       {} / {} at leverage {}",
        result.strategy.selector, result.strategy.weighting, result.strategy.leverage_limit
    );
    println!("Cost model:     {}", result.cost_model);
    println!();
    println!("Initial cash:   {:>16.2}", result.initial_cash);
    println!("Final cash:     {:>16.2}", result.final_cash);
    println!("Total return:   {:>15.2}%", m.total_return * 100.0);
    println!("CAGR:           {:>15.2}%", m.cagr * 100.0);
    println!("Sharpe:         {:>16.3}", m.sharpe);
    println!("Volatility:     {:>15.2}%", m.annual_volatility * 100.0);
    println!("Max drawdown:   {:>15.2}%", m.max_drawdown * 100.0);
    println!("Mean drawdown:  {:>15.2}%", m.mean_drawdown * 100.0);
    println!("Costs:          {:>16.2}", result.total_transaction_cost);
    println!("Holding fees:   {:>16.2}", result.total_holding_fees);
    if let Some(date) = result.depleted_on {
        println!("Depleted on:    {date}");
    }
    if !result.final_holdings.is_empty() {
        println!();
        println!("Final holdings:");
        for (symbol, weight) in &result.final_holdings {
            println!("  {symbol:<10} {weight:>8.4}");
        }
    }
}
