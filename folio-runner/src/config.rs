//! TOML backtest configuration.
//!
//! ```toml
//! [backtest]
//! start_date = "2020-01-02"
//! end_date = "2023-12-29"
//! initial_cash = 1000000.0
//! holding_fee_rate = 0.03
//! risk_free_rate = 0.02
//!
//! [strategy]
//! top_n = 10
//! leverage_limit = 0.5
//! weighting = "rank"
//!
//! [cost_model]
//! type = "proportional_impact"
//! a = 0.0005
//! b = 1.0
//!
//! [data]
//! source = "csv"
//! path = "prices.csv"
//! ```

use chrono::NaiveDate;
use folio_core::cost::CostModelConfig;
use folio_core::data::FeatureWindows;
use folio_core::engine::SimulationConfig;
use folio_core::strategy::{PositionStrategy, TopNSelector, WeightingError, WeightingScheme};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Everything needed to reproduce a single backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub strategy: StrategySection,
    #[serde(default)]
    pub cost_model: CostModelConfig,
    pub data: DataSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    #[serde(default = "default_holding_fee_rate")]
    pub holding_fee_rate: f64,
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
}

fn default_initial_cash() -> f64 {
    1_000_000.0
}

fn default_holding_fee_rate() -> f64 {
    0.03
}

fn default_risk_free_rate() -> f64 {
    0.02
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySection {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_leverage_limit")]
    pub leverage_limit: f64,
    #[serde(default)]
    pub weighting: WeightingScheme,
    /// Precomputed `date,symbol,weight` schedule; replaces selection and weighting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<PathBuf>,
    /// Evaluate schedule dates on the rayon pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

fn default_top_n() -> usize {
    10
}

fn default_leverage_limit() -> f64 {
    0.5
}

fn default_true() -> bool {
    true
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            leverage_limit: default_leverage_limit(),
            weighting: WeightingScheme::default(),
            schedule: None,
            parallel: true,
        }
    }
}

/// Where price data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceKind {
    Csv,
    Parquet,
    Synthetic,
}

impl DataSourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
            Self::Synthetic => "synthetic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    pub source: DataSourceKind,
    /// File path for `csv` and `parquet` sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Symbols for the `synthetic` source.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
    /// Seed for the `synthetic` source.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub windows: FeatureWindows,
}

impl DataSection {
    pub fn csv(path: impl Into<PathBuf>) -> Self {
        Self::file(DataSourceKind::Csv, path.into())
    }

    pub fn parquet(path: impl Into<PathBuf>) -> Self {
        Self::file(DataSourceKind::Parquet, path.into())
    }

    pub fn synthetic(symbols: Vec<String>, seed: u64) -> Self {
        Self {
            source: DataSourceKind::Synthetic,
            path: None,
            symbols,
            seed,
            windows: FeatureWindows::default(),
        }
    }

    fn file(source: DataSourceKind, path: PathBuf) -> Self {
        Self {
            source,
            path: Some(path),
            symbols: Vec::new(),
            seed: 0,
            windows: FeatureWindows::default(),
        }
    }
}

impl BacktestConfig {
    /// Minimal config with every optional section at its default.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, data: DataSection) -> Self {
        Self {
            backtest: BacktestSection {
                start_date,
                end_date,
                initial_cash: default_initial_cash(),
                holding_fee_rate: default_holding_fee_rate(),
                risk_free_rate: default_risk_free_rate(),
            },
            strategy: StrategySection::default(),
            cost_model: CostModelConfig::default(),
            data,
        }
    }

    /// Read, parse, and validate a TOML file. Relative data and schedule
    /// paths resolve against the config file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.backtest;
        if b.start_date > b.end_date {
            return Err(ConfigError::invalid(
                "backtest.start_date",
                format!("{} is after end_date {}", b.start_date, b.end_date),
            ));
        }
        if !b.initial_cash.is_finite() || b.initial_cash <= 0.0 {
            return Err(ConfigError::invalid(
                "backtest.initial_cash",
                format!("must be positive, got {}", b.initial_cash),
            ));
        }
        if !b.holding_fee_rate.is_finite() || b.holding_fee_rate < 0.0 {
            return Err(ConfigError::invalid(
                "backtest.holding_fee_rate",
                format!("must be non-negative, got {}", b.holding_fee_rate),
            ));
        }
        if !b.risk_free_rate.is_finite() || b.risk_free_rate <= -1.0 {
            return Err(ConfigError::invalid(
                "backtest.risk_free_rate",
                format!("must be greater than -1, got {}", b.risk_free_rate),
            ));
        }

        let s = &self.strategy;
        if s.schedule.is_none() && s.top_n == 0 {
            return Err(ConfigError::invalid("strategy.top_n", "must be at least 1"));
        }
        if !s.leverage_limit.is_finite() || s.leverage_limit < 0.0 {
            return Err(ConfigError::invalid(
                "strategy.leverage_limit",
                format!("must be non-negative, got {}", s.leverage_limit),
            ));
        }

        match &self.cost_model {
            CostModelConfig::ProportionalImpact { a, b, c } => {
                if ![a, b, c].iter().all(|v| v.is_finite()) {
                    return Err(ConfigError::invalid(
                        "cost_model",
                        "impact coefficients must be finite",
                    ));
                }
            }
            CostModelConfig::FixedRate { fee_rate } => {
                if !fee_rate.is_finite() || *fee_rate < 0.0 {
                    return Err(ConfigError::invalid(
                        "cost_model.fee_rate",
                        format!("must be non-negative, got {fee_rate}"),
                    ));
                }
            }
        }

        let d = &self.data;
        match d.source {
            DataSourceKind::Csv | DataSourceKind::Parquet if d.path.is_none() => {
                return Err(ConfigError::invalid(
                    "data.path",
                    format!("required for source '{}'", d.source.as_str()),
                ));
            }
            DataSourceKind::Synthetic if d.symbols.is_empty() => {
                return Err(ConfigError::invalid(
                    "data.symbols",
                    "synthetic source needs at least one symbol",
                ));
            }
            _ => {}
        }
        if d.windows.volatility < 2 || d.windows.score < 2 {
            return Err(ConfigError::invalid(
                "data.windows",
                format!(
                    "windows must be at least 2 (volatility={}, score={})",
                    d.windows.volatility, d.windows.score
                ),
            ));
        }

        Ok(())
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig::new(self.backtest.start_date, self.backtest.end_date)
            .with_initial_cash(self.backtest.initial_cash)
            .with_holding_fee_rate(self.backtest.holding_fee_rate)
    }

    /// Top-N selection feeding the configured weighting scheme.
    pub fn position_strategy(&self) -> Result<PositionStrategy, WeightingError> {
        let s = &self.strategy;
        Ok(PositionStrategy::new(
            Box::new(TopNSelector::new(s.top_n)),
            s.weighting.build(),
            s.leverage_limit,
        )?
        .with_parallelism(s.parallel))
    }

    fn resolve_paths(&mut self, base: &Path) {
        if let Some(p) = self.data.path.as_mut() {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
        if let Some(p) = self.strategy.schedule.as_mut() {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[backtest]
start_date = "2021-01-04"
end_date = "2021-12-31"
initial_cash = 500000.0
holding_fee_rate = 0.05
risk_free_rate = 0.01

[strategy]
top_n = 5
leverage_limit = 0.8
weighting = "risk_parity"

[cost_model]
type = "fixed_rate"
fee_rate = 0.001

[data]
source = "csv"
path = "prices.csv"

[data.windows]
volatility = 20
score = 10
"#;

    const MINIMAL: &str = r#"
[backtest]
start_date = "2021-01-04"
end_date = "2021-12-31"

[data]
source = "synthetic"
symbols = ["AAA", "BBB"]
"#;

    #[test]
    fn parses_full_config() {
        let cfg = BacktestConfig::from_toml(FULL).unwrap();
        assert_eq!(cfg.backtest.initial_cash, 500_000.0);
        assert_eq!(cfg.strategy.top_n, 5);
        assert_eq!(cfg.strategy.weighting, WeightingScheme::RiskParity);
        assert_eq!(cfg.cost_model, CostModelConfig::FixedRate { fee_rate: 0.001 });
        assert_eq!(cfg.data.source, DataSourceKind::Csv);
        assert_eq!(cfg.data.windows.volatility, 20);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = BacktestConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(cfg.backtest.initial_cash, 1_000_000.0);
        assert_eq!(cfg.backtest.holding_fee_rate, 0.03);
        assert_eq!(cfg.backtest.risk_free_rate, 0.02);
        assert_eq!(cfg.strategy.top_n, 10);
        assert_eq!(cfg.strategy.leverage_limit, 0.5);
        assert_eq!(cfg.strategy.weighting, WeightingScheme::Rank);
        assert_eq!(cfg.cost_model, CostModelConfig::default());
        assert_eq!(cfg.data.windows, FeatureWindows::default());
    }

    #[test]
    fn unknown_cost_model_is_parse_error() {
        let bad = MINIMAL.to_string() + "\n[cost_model]\ntype = \"mystery\"\n";
        assert!(matches!(
            BacktestConfig::from_toml(&bad),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn reversed_dates_rejected() {
        let bad = MINIMAL.replace("2021-01-04", "2022-06-01");
        let err = BacktestConfig::from_toml(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "backtest.start_date", .. }));
    }

    #[test]
    fn negative_leverage_rejected() {
        let bad = MINIMAL.to_string() + "\n[strategy]\nleverage_limit = -0.5\n";
        let err = BacktestConfig::from_toml(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "strategy.leverage_limit", .. }));
    }

    #[test]
    fn file_source_needs_path() {
        let bad = MINIMAL.replace("source = \"synthetic\"", "source = \"parquet\"");
        let err = BacktestConfig::from_toml(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "data.path", .. }));
    }

    #[test]
    fn run_id_deterministic_and_sensitive() {
        let a = BacktestConfig::from_toml(MINIMAL).unwrap();
        let mut b = a.clone();
        assert_eq!(a.run_id().unwrap(), b.run_id().unwrap());
        b.strategy.leverage_limit = 0.6;
        assert_ne!(a.run_id().unwrap(), b.run_id().unwrap());
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let mut cfg = BacktestConfig::from_toml(FULL).unwrap();
        cfg.resolve_paths(Path::new("/data/runs"));
        assert_eq!(cfg.data.path.as_deref(), Some(Path::new("/data/runs/prices.csv")));
    }
}
