//! Built-in weighting policies: rank, uniform, inverse volatility.
//!
//! Each policy produces raw scores and then rescales them so that the gross
//! exposure equals the leverage limit exactly.

use super::{scale_to_leverage, Pick, Weighting, WeightingContext, WeightingError};
use crate::domain::{Symbol, Weights};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Standardized rank scores.
///
/// Picks are ranked n, n−1, …, 1 in selection order, standardized to zero mean
/// and unit (population) variance, then scaled to the leverage limit. The top
/// half ends up long and the bottom half short; declared sides are ignored.
/// A single pick has no dispersion and receives the whole limit long.
#[derive(Debug, Clone, Default)]
pub struct RankWeighting;

impl Weighting for RankWeighting {
    fn weights(&self, picks: &[Pick], ctx: &WeightingContext<'_>) -> Result<Weights, WeightingError> {
        let n = picks.len();
        match n {
            0 => return Ok(Weights::new()),
            1 => {
                let mut w = Weights::new();
                w.insert(picks[0].symbol.clone(), ctx.leverage);
                return Ok(w);
            }
            _ => {}
        }

        let nf = n as f64;
        let mean = (nf + 1.0) / 2.0;
        let std = ((nf * nf - 1.0) / 12.0).sqrt();
        let raw: Vec<(Symbol, f64)> = picks
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let rank = (n - i) as f64;
                (p.symbol.clone(), (rank - mean) / std)
            })
            .collect();
        Ok(scale_to_leverage(raw, ctx.leverage))
    }

    fn name(&self) -> &str {
        "rank"
    }
}

/// Equal absolute weight per pick, signed by the declared side.
#[derive(Debug, Clone, Default)]
pub struct UniformWeighting;

impl Weighting for UniformWeighting {
    fn weights(&self, picks: &[Pick], ctx: &WeightingContext<'_>) -> Result<Weights, WeightingError> {
        if picks.is_empty() {
            return Ok(Weights::new());
        }
        let each = ctx.leverage / picks.len() as f64;
        Ok(picks
            .iter()
            .map(|p| (p.symbol.clone(), p.side.sign() * each))
            .collect())
    }

    fn name(&self) -> &str {
        "uniform"
    }
}

/// Risk parity: weight ∝ 1/σ using the trailing volatility on the date.
///
/// A zero, negative, or missing σ cannot be inverted and is reported as
/// [`WeightingError::DegenerateVolatility`].
#[derive(Debug, Clone, Default)]
pub struct InverseVolatility;

impl Weighting for InverseVolatility {
    fn weights(&self, picks: &[Pick], ctx: &WeightingContext<'_>) -> Result<Weights, WeightingError> {
        let mut raw = Vec::with_capacity(picks.len());
        for pick in picks {
            let record = ctx.dataset.record(&pick.symbol, ctx.date).ok_or_else(|| {
                WeightingError::MissingRecord {
                    symbol: pick.symbol.clone(),
                    date: ctx.date,
                }
            })?;
            if !record.has_usable_volatility() {
                return Err(WeightingError::DegenerateVolatility {
                    symbol: pick.symbol.clone(),
                    date: ctx.date,
                    value: record.volatility,
                });
            }
            raw.push((pick.symbol.clone(), pick.side.sign() / record.volatility));
        }
        Ok(scale_to_leverage(raw, ctx.leverage))
    }

    fn name(&self) -> &str {
        "risk_parity"
    }
}

/// Serializable choice of built-in weighting policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingScheme {
    #[default]
    Rank,
    Uniform,
    RiskParity,
}

impl WeightingScheme {
    pub fn build(self) -> Box<dyn Weighting> {
        match self {
            Self::Rank => Box::new(RankWeighting),
            Self::Uniform => Box::new(UniformWeighting),
            Self::RiskParity => Box::new(InverseVolatility),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rank => "rank",
            Self::Uniform => "uniform",
            Self::RiskParity => "risk_parity",
        }
    }
}

impl FromStr for WeightingScheme {
    type Err = WeightingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rank" | "default" => Ok(Self::Rank),
            "uniform" => Ok(Self::Uniform),
            "risk_parity" | "rp" => Ok(Self::RiskParity),
            other => Err(WeightingError::UnknownScheme(other.to_string())),
        }
    }
}
