//! Transaction cost models.
//!
//! A cost model maps a traded notional plus the instrument's market snapshot to
//! a non-negative cost. Models never fail: degenerate inputs degrade to zero.

pub mod fixed;
pub mod impact;

pub use fixed::FixedRate;
pub use impact::ProportionalImpact;

use crate::domain::PriceRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Per-trade snapshot handed to a cost model.
#[derive(Debug, Clone, Copy)]
pub struct TradeContext<'a> {
    pub symbol: &'a str,
    pub date: NaiveDate,
    pub record: &'a PriceRecord,
    /// Traded notional, `|Δweight| × cash`.
    pub amount: f64,
}

/// Transaction cost policy.
///
/// # Responsibilities
/// - Convert a trade notional and market context into a cost
///
/// # Non-Responsibilities
/// - Cost models do NOT decide what to trade
/// - Cost models do NOT raise on odd inputs; they return 0.0 instead
pub trait TransactionCostModel: Send + Sync {
    fn cost(&self, ctx: &TradeContext<'_>) -> f64;

    /// Model name for manifest/logging
    fn name(&self) -> &str;
}

#[derive(Debug, Error)]
pub enum CostModelError {
    #[error("unknown cost model '{0}' (expected proportional_impact or fixed_rate)")]
    Unknown(String),

    #[error("cost model '{model}' requires parameter '{param}'")]
    MissingParam { model: String, param: String },
}

/// Serializable cost model selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CostModelConfig {
    /// `a·|x| + b·σ/√(volume·close)·|x|^1.5 + c·x`, divided by close.
    ProportionalImpact {
        #[serde(default = "impact::default_a")]
        a: f64,
        #[serde(default = "impact::default_b")]
        b: f64,
        #[serde(default)]
        c: f64,
    },

    /// `|amount| × fee_rate`.
    FixedRate { fee_rate: f64 },
}

impl Default for CostModelConfig {
    fn default() -> Self {
        Self::ProportionalImpact {
            a: impact::default_a(),
            b: impact::default_b(),
            c: 0.0,
        }
    }
}

impl CostModelConfig {
    /// Resolve a model by identifier, e.g. from a command-line flag.
    ///
    /// Missing impact coefficients fall back to their defaults; `fixed_rate`
    /// requires `fee_rate`.
    pub fn from_name(name: &str, params: &BTreeMap<String, f64>) -> Result<Self, CostModelError> {
        match name {
            "proportional_impact" | "default" => Ok(Self::ProportionalImpact {
                a: params.get("a").copied().unwrap_or_else(impact::default_a),
                b: params.get("b").copied().unwrap_or_else(impact::default_b),
                c: params.get("c").copied().unwrap_or(0.0),
            }),
            "fixed_rate" | "fixed" => {
                let fee_rate =
                    params
                        .get("fee_rate")
                        .copied()
                        .ok_or_else(|| CostModelError::MissingParam {
                            model: name.to_string(),
                            param: "fee_rate".into(),
                        })?;
                Ok(Self::FixedRate { fee_rate })
            }
            other => Err(CostModelError::Unknown(other.to_string())),
        }
    }

    pub fn build(&self) -> Box<dyn TransactionCostModel> {
        match *self {
            Self::ProportionalImpact { a, b, c } => Box::new(ProportionalImpact::new(a, b, c)),
            Self::FixedRate { fee_rate } => Box::new(FixedRate::new(fee_rate)),
        }
    }
}
