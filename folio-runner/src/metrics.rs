//! Performance metrics — pure functions that compute portfolio statistics.
//!
//! Every metric is a pure function: value series in, scalar out. The series is
//! the simulator's cash values with the anchor at index 0.

use folio_core::engine::TRADING_DAYS_PER_YEAR;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("need at least 2 values to compute statistics, got {0}")]
    TooFewPoints(usize),

    #[error("initial value must be positive, got {0}")]
    NonPositiveInitial(f64),
}

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub annual_volatility: f64,
    /// Largest peak-to-trough decline, as a positive fraction.
    pub max_drawdown: f64,
    pub mean_drawdown: f64,
    /// Number of values, anchor included.
    pub periods: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from a value series.
    pub fn compute(values: &[f64], risk_free_rate: f64) -> Result<Self, MetricsError> {
        if values.len() < 2 {
            return Err(MetricsError::TooFewPoints(values.len()));
        }
        if values[0].is_nan() || values[0] <= 0.0 {
            return Err(MetricsError::NonPositiveInitial(values[0]));
        }
        let drawdowns = drawdown_series(values);
        Ok(Self {
            total_return: total_return(values),
            cagr: cagr(values),
            sharpe: sharpe_ratio(values, risk_free_rate),
            annual_volatility: annual_volatility(values),
            max_drawdown: drawdowns.iter().copied().fold(0.0, f64::max),
            mean_drawdown: mean_f64(&drawdowns),
            periods: values.len(),
        })
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: final / initial − 1.
pub fn total_return(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(&initial), Some(&last)) if values.len() >= 2 && initial > 0.0 => last / initial - 1.0,
        _ => 0.0,
    }
}

/// Compound Annual Growth Rate.
///
/// Years are `values.len() / 252`, anchor included. A depleted series gives −1.
pub fn cagr(values: &[f64]) -> f64 {
    let (Some(&initial), Some(&last)) = (values.first(), values.last()) else {
        return 0.0;
    };
    if values.len() < 2 || initial <= 0.0 {
        return 0.0;
    }
    let years = values.len() as f64 / TRADING_DAYS_PER_YEAR;
    (last / initial).powf(1.0 / years) - 1.0
}

/// Daily risk-free rate equivalent to an annual one.
pub fn daily_risk_free(annual: f64) -> f64 {
    (1.0 + annual).powf(1.0 / TRADING_DAYS_PER_YEAR) - 1.0
}

/// Annualized Sharpe ratio from daily returns.
///
/// Sharpe = (mean(returns) − rf_daily) / std(returns) × √252, population std.
/// Returns 0.0 if the std is zero or there are no returns.
pub fn sharpe_ratio(values: &[f64], risk_free_rate: f64) -> f64 {
    let returns = daily_returns(values);
    if returns.is_empty() {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean_f64(&returns) - daily_risk_free(risk_free_rate)) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Population std of daily returns, annualized.
pub fn annual_volatility(values: &[f64]) -> f64 {
    std_dev(&daily_returns(values)) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// `1 − v / running_max` at every point.
pub fn drawdown_series(values: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    values
        .iter()
        .map(|&v| {
            peak = peak.max(v);
            if peak > 0.0 {
                1.0 - v / peak
            } else {
                0.0
            }
        })
        .collect()
}

/// Maximum drawdown as a positive fraction (0.15 = 15% below the peak).
pub fn max_drawdown(values: &[f64]) -> f64 {
    drawdown_series(values).into_iter().fold(0.0, f64::max)
}

pub fn mean_drawdown(values: &[f64]) -> f64 {
    mean_f64(&drawdown_series(values))
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive values.
///
/// Periods whose previous value is zero are skipped.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
