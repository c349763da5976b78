//! Mutable portfolio state and per-date ledger entries.

use crate::domain::Holdings;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle of a portfolio. `Depleted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Active,
    Depleted,
}

/// Cash plus signed weights, evolved in place once per date.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub cash: f64,
    pub holdings: Holdings,
}

impl PortfolioState {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            holdings: Holdings::new(),
        }
    }

    /// NaN cash counts as depleted.
    pub fn is_depleted(&self) -> bool {
        self.cash.is_nan() || self.cash == 0.0
    }

    pub fn phase(&self) -> Phase {
        if self.is_depleted() {
            Phase::Depleted
        } else {
            Phase::Active
        }
    }
}

/// What happened to cash on one simulated date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyLedger {
    pub date: NaiveDate,
    /// Realized `pct_chg × prior_weight × cash`, summed over held symbols.
    pub returns: f64,
    pub transaction_cost: f64,
    pub holding_fee: f64,
    /// Cash after the clamp.
    pub cash: f64,
    /// Σ|Δweight| traded on this date.
    pub turnover: f64,
}

impl DailyLedger {
    pub(crate) fn idle(date: NaiveDate) -> Self {
        Self {
            date,
            returns: 0.0,
            transaction_cost: 0.0,
            holding_fee: 0.0,
            cash: 0.0,
            turnover: 0.0,
        }
    }
}
