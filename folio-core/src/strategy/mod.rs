//! Position strategies — which symbols to hold on a date and at what weight.
//!
//! A strategy is two stages composed by [`PositionStrategy`]:
//! - a [`Selector`] picks the ordered, eligible symbols for a date
//! - a [`Weighting`] turns those picks into signed weights under a leverage cap
//!
//! Neither stage sees realized portfolio performance, so every date can be
//! evaluated independently before the simulation starts.

pub mod builder;
pub mod selection;
pub mod weighting;

pub use builder::PositionStrategy;
pub use selection::{FixedSelector, TopNSelector};
pub use weighting::{
    InverseVolatility, RankWeighting, UniformWeighting, WeightingScheme,
};

use crate::data::PriceDataset;
use crate::domain::{Symbol, Weights};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Declared direction of a selected symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

/// A selected symbol with its declared side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    pub symbol: Symbol,
    pub side: Side,
}

impl Pick {
    pub fn long(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            side: Side::Long,
        }
    }

    pub fn short(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            side: Side::Short,
        }
    }
}

/// Inputs a weighting policy may consult for one date.
#[derive(Debug, Clone, Copy)]
pub struct WeightingContext<'a> {
    pub dataset: &'a PriceDataset,
    pub date: NaiveDate,
    /// Gross exposure the weights must add up to.
    pub leverage: f64,
}

#[derive(Debug, Error)]
pub enum WeightingError {
    #[error("risk parity: volatility for {symbol} on {date} is {value}, cannot invert")]
    DegenerateVolatility {
        symbol: String,
        date: NaiveDate,
        value: f64,
    },

    #[error("weighting: no price record for {symbol} on {date}")]
    MissingRecord { symbol: String, date: NaiveDate },

    #[error("unknown weighting scheme '{0}' (expected rank, uniform, or risk_parity)")]
    UnknownScheme(String),

    #[error("leverage limit must be finite and non-negative, got {0}")]
    InvalidLeverage(f64),
}

/// Selection stage.
///
/// # Responsibilities
/// - Return the eligible symbols for a date, best first, with declared sides
///
/// # Non-Responsibilities
/// - Selectors do NOT size positions (that's the weighting's job)
pub trait Selector: Send + Sync {
    fn select(&self, dataset: &PriceDataset, date: NaiveDate) -> Vec<Pick>;

    /// Selector name for manifest/logging
    fn name(&self) -> &str;
}

/// Weighting stage.
///
/// Built-in policies guarantee `Σ|w| == ctx.leverage` for any non-empty pick list.
pub trait Weighting: Send + Sync {
    fn weights(&self, picks: &[Pick], ctx: &WeightingContext<'_>) -> Result<Weights, WeightingError>;

    /// Weighting name for manifest/logging
    fn name(&self) -> &str;
}

/// Multiply every weight by `leverage / Σ|w|`.
///
/// Leaves an all-zero vector untouched.
pub(crate) fn scale_to_leverage(raw: Vec<(Symbol, f64)>, leverage: f64) -> Weights {
    let gross: f64 = raw.iter().map(|(_, w)| w.abs()).sum();
    if gross == 0.0 {
        return raw.into_iter().collect();
    }
    let k = leverage / gross;
    raw.into_iter().map(|(s, w)| (s, w * k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_signs() {
        assert_eq!(Side::Long.sign(), 1.0);
        assert_eq!(Side::Short.sign(), -1.0);
    }

    #[test]
    fn scale_to_leverage_hits_target() {
        let raw = vec![("A".to_string(), 2.0), ("B".to_string(), -6.0)];
        let w = scale_to_leverage(raw, 0.4);
        assert!((w["A"] - 0.1).abs() < 1e-12);
        assert!((w["B"] + 0.3).abs() < 1e-12);
    }

    #[test]
    fn scale_to_leverage_all_zero_untouched() {
        let raw = vec![("A".to_string(), 0.0)];
        let w = scale_to_leverage(raw, 0.4);
        assert_eq!(w["A"], 0.0);
    }
}
