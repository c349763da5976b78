//! Backtest runner — wires together data, strategy, simulator, and metrics.
//!
//! Three entry points:
//! - `run_backtest()`: loads data (and an optional schedule file), then runs. Used by CLI.
//! - `run_backtest_from_data()`: takes pre-loaded data and builds the schedule
//!   from the configured strategy. Used by sweeps.
//! - `run_with_schedule()`: takes pre-loaded data and an explicit schedule.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use folio_core::data::DataError;
use folio_core::domain::{PositionSchedule, ValuePoint};
use folio_core::engine::{simulate, DailyLedger, SimulationError};
use folio_core::strategy::WeightingError;

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_dataset, load_schedule_csv, LoadError, LoadedData};
use crate::metrics::{MetricsError, PerformanceMetrics};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("schedule error: {0}")]
    Schedule(#[from] DataError),
    #[error("weighting error: {0}")]
    Weighting(#[from] WeightingError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),
    #[error("dataset has no dates between {start} and {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },
    #[error("schedule gross exposure {exposure} exceeds leverage limit {limit}")]
    ExposureExceeded { exposure: f64, limit: f64 },
}

/// Slack allowed when comparing an external schedule's exposure to the limit.
const EXPOSURE_TOLERANCE: f64 = 1e-9;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// How the schedule was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    /// `top_n` or `schedule_file`.
    pub selector: String,
    /// Weighting scheme name, or `precomputed`.
    pub weighting: String,
    pub leverage_limit: f64,
    pub top_n: Option<usize>,
    /// Largest Σ|w| on any scheduled date.
    pub max_gross_exposure: f64,
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_cash: f64,
    pub final_cash: f64,
    pub metrics: PerformanceMetrics,
    pub strategy: StrategySummary,
    pub cost_model: String,
    pub final_holdings: BTreeMap<String, f64>,
    pub series: Vec<ValuePoint>,
    pub ledger: Vec<DailyLedger>,
    pub total_transaction_cost: f64,
    pub total_holding_fees: f64,
    pub total_turnover: f64,
    pub depleted_on: Option<NaiveDate>,
    pub symbol_count: usize,
    pub date_count: usize,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    /// Cash values in order, anchor first.
    pub fn values(&self) -> Vec<f64> {
        self.series.iter().map(|p| p.cash).collect()
    }
}

/// Run a single backtest from a BacktestConfig, loading everything it names.
pub fn run_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let loaded = load_dataset(
        &config.data,
        config.backtest.start_date,
        config.backtest.end_date,
    )?;

    match &config.strategy.schedule {
        Some(path) => {
            let schedule = load_schedule_csv(path)?;
            info!(path = %path.display(), dates = schedule.len(), "loaded precomputed schedule");
            run_with_schedule(config, &loaded, &schedule)
        }
        None => run_backtest_from_data(config, &loaded),
    }
}

/// Run a backtest with pre-loaded data — no I/O.
///
/// The schedule is built from `[strategy]` over the dataset dates in range.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    loaded: &LoadedData,
) -> Result<BacktestResult, RunError> {
    let dates = simulation_dates(config, loaded)?;
    let strategy = config.position_strategy()?;
    let schedule = strategy.schedule(&loaded.dataset, &dates)?;

    let summary = StrategySummary {
        selector: strategy.selector_name().to_string(),
        weighting: strategy.weighting_name().to_string(),
        leverage_limit: strategy.leverage(),
        top_n: Some(config.strategy.top_n),
        max_gross_exposure: schedule.max_gross_exposure(),
    };
    execute(config, loaded, &schedule, summary)
}

/// Run a backtest with pre-loaded data and an externally supplied schedule.
///
/// The schedule's gross exposure on every date must stay within
/// `strategy.leverage_limit`.
pub fn run_with_schedule(
    config: &BacktestConfig,
    loaded: &LoadedData,
    schedule: &PositionSchedule,
) -> Result<BacktestResult, RunError> {
    simulation_dates(config, loaded)?;
    let limit = config.strategy.leverage_limit;
    let exposure = schedule.max_gross_exposure();
    if exposure > limit + EXPOSURE_TOLERANCE {
        return Err(RunError::ExposureExceeded { exposure, limit });
    }
    let summary = StrategySummary {
        selector: "schedule_file".to_string(),
        weighting: "precomputed".to_string(),
        leverage_limit: config.strategy.leverage_limit,
        top_n: None,
        max_gross_exposure: schedule.max_gross_exposure(),
    };
    execute(config, loaded, schedule, summary)
}

fn simulation_dates(
    config: &BacktestConfig,
    loaded: &LoadedData,
) -> Result<Vec<NaiveDate>, RunError> {
    let (start, end) = (config.backtest.start_date, config.backtest.end_date);
    let dates = loaded.dataset.dates_between(start, end);
    if dates.is_empty() {
        return Err(RunError::EmptyRange { start, end });
    }
    Ok(dates)
}

fn execute(
    config: &BacktestConfig,
    loaded: &LoadedData,
    schedule: &PositionSchedule,
    strategy: StrategySummary,
) -> Result<BacktestResult, RunError> {
    let dataset = &loaded.dataset;
    schedule.validate_against(dataset)?;

    let cost_model = config.cost_model.build();
    let sim = simulate(config.simulation_config(), dataset, schedule, cost_model.as_ref())?;

    let values = sim.series.values();
    let metrics = PerformanceMetrics::compute(&values, config.backtest.risk_free_rate)?;
    let run_id = config.run_id()?;

    info!(
        run_id = %&run_id[..12],
        weighting = %strategy.weighting,
        final_cash = sim.final_cash(),
        sharpe = metrics.sharpe,
        cagr = metrics.cagr,
        max_drawdown = metrics.max_drawdown,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        dataset_hash: loaded.dataset_hash.clone(),
        has_synthetic: loaded.has_synthetic,
        start_date: config.backtest.start_date,
        end_date: config.backtest.end_date,
        initial_cash: config.backtest.initial_cash,
        final_cash: sim.final_cash(),
        metrics,
        strategy,
        cost_model: cost_model.name().to_string(),
        final_holdings: sim.final_holdings.as_weights().clone(),
        total_transaction_cost: sim.total_transaction_cost(),
        total_holding_fees: sim.total_holding_fees(),
        total_turnover: sim.total_turnover(),
        depleted_on: sim.depleted_on,
        series: sim.series.points().to_vec(),
        ledger: sim.ledger,
        symbol_count: dataset.symbol_count(),
        date_count: values.len() - 1,
    })
}
