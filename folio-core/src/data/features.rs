//! Per-symbol derived columns: percentage change, rolling volatility, rolling Sharpe.
//!
//! Used by the dataset builder when the source does not already carry a column.
//! All functions return one value per input and use NaN for warmup positions.

use serde::{Deserialize, Serialize};

/// Window lengths used when features are derived from closes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureWindows {
    /// Rolling std window over close prices.
    #[serde(default = "default_volatility_window")]
    pub volatility: usize,
    /// Rolling Sharpe window over daily returns.
    #[serde(default = "default_score_window")]
    pub score: usize,
}

fn default_volatility_window() -> usize {
    180
}

fn default_score_window() -> usize {
    60
}

impl Default for FeatureWindows {
    fn default() -> Self {
        Self {
            volatility: default_volatility_window(),
            score: default_score_window(),
        }
    }
}

/// Simple percentage change; the first element is NaN.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in 1..values.len() {
        out[i] = (values[i] - values[i - 1]) / values[i - 1];
    }
    out
}

/// Rolling sample standard deviation (n − 1 denominator).
///
/// Positions before the window fills, and any window containing NaN, are NaN.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window < 2 {
        return out;
    }
    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
        out[i] = var.sqrt();
    }
    out
}

/// Rolling mean / sample std of returns (unannualized Sharpe-like score).
///
/// NaN while the window is incomplete, contains NaN, or has zero dispersion.
pub fn rolling_sharpe(returns: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; returns.len()];
    if window < 2 {
        return out;
    }
    let stds = rolling_std(returns, window);
    for i in (window - 1)..returns.len() {
        let std = stds[i];
        if !std.is_finite() || std == 0.0 {
            continue;
        }
        let mean = returns[i + 1 - window..=i].iter().sum::<f64>() / window as f64;
        out[i] = mean / std;
    }
    out
}
