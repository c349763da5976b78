//! Folio Runner — backtest orchestration, data loading, statistics, sweeps.
//!
//! This crate builds on `folio-core` to provide:
//! - TOML configuration with defaults and validation
//! - Dataset loading from CSV, Parquet, or a seeded synthetic walk
//! - Single-backtest runner producing a versioned `BacktestResult`
//! - Performance statistics (Sharpe, CAGR, drawdown)
//! - Parallel parameter sweeps
//! - JSON and CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, ConfigError, DataSection, DataSourceKind, RunId};
pub use data_loader::{load_dataset, load_schedule_csv, LoadError, LoadedData};
pub use export::{load_artifacts, save_artifacts};
pub use metrics::{MetricsError, PerformanceMetrics};
pub use runner::{
    run_backtest, run_backtest_from_data, run_with_schedule, BacktestResult, RunError,
    SCHEMA_VERSION,
};
pub use sweep::{ParamGrid, ParamSweep, SweepResults};
