//! The sequential simulation loop.

use super::fees::holding_fee;
use super::state::{DailyLedger, Phase, PortfolioState};
use crate::cost::{TradeContext, TransactionCostModel};
use crate::data::{DataError, PriceDataset};
use crate::domain::{Holdings, PortfolioValueSeries, PositionSchedule, PriceRecord, Symbol};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Inputs that shape a single simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    /// Annual borrow rate charged on short weights.
    #[serde(default = "default_holding_fee_rate")]
    pub holding_fee_rate: f64,
}

fn default_initial_cash() -> f64 {
    1_000_000.0
}

fn default_holding_fee_rate() -> f64 {
    0.03
}

impl SimulationConfig {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            initial_cash: default_initial_cash(),
            holding_fee_rate: default_holding_fee_rate(),
        }
    }

    pub fn with_initial_cash(mut self, cash: f64) -> Self {
        self.initial_cash = cash;
        self
    }

    pub fn with_holding_fee_rate(mut self, rate: f64) -> Self {
        self.holding_fee_rate = rate;
        self
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.start > self.end {
            return Err(SimulationError::InvalidConfig(format!(
                "start {} is after end {}",
                self.start, self.end
            )));
        }
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(SimulationError::InvalidConfig(format!(
                "initial_cash must be positive, got {}",
                self.initial_cash
            )));
        }
        if !self.holding_fee_rate.is_finite() || self.holding_fee_rate < 0.0 {
            return Err(SimulationError::InvalidConfig(format!(
                "holding_fee_rate must be non-negative, got {}",
                self.holding_fee_rate
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("no price record for {symbol} on {date}")]
    MissingPrice { symbol: String, date: NaiveDate },

    #[error("date {date} is not after the last simulated date {last}")]
    OutOfOrder { date: NaiveDate, last: NaiveDate },

    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Data(DataError),
}

impl From<DataError> for SimulationError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::MissingRecord { symbol, date } => Self::MissingPrice { symbol, date },
            other => Self::Data(other),
        }
    }
}

/// Everything a finished simulation produces.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub series: PortfolioValueSeries,
    pub final_holdings: Holdings,
    pub ledger: Vec<DailyLedger>,
    pub depleted_on: Option<NaiveDate>,
}

impl SimulationResult {
    pub fn final_cash(&self) -> f64 {
        self.series.last().cash
    }

    pub fn total_transaction_cost(&self) -> f64 {
        self.ledger.iter().map(|l| l.transaction_cost).sum()
    }

    pub fn total_holding_fees(&self) -> f64 {
        self.ledger.iter().map(|l| l.holding_fee).sum()
    }

    pub fn total_turnover(&self) -> f64 {
        self.ledger.iter().map(|l| l.turnover).sum()
    }
}

/// One symbol's slice of a rebalance, resolved before any state changes.
struct Leg<'d> {
    symbol: Symbol,
    record: &'d PriceRecord,
    current: f64,
    target: f64,
}

/// Stateful simulator over borrowed, read-only inputs.
///
/// Dates must be fed strictly ascending. Use [`Simulator::run`] to walk the
/// configured calendar, or [`Simulator::rebalance`] to step manually.
pub struct Simulator<'a> {
    dataset: &'a PriceDataset,
    schedule: &'a PositionSchedule,
    cost_model: &'a dyn TransactionCostModel,
    config: SimulationConfig,
    state: PortfolioState,
    series: PortfolioValueSeries,
    ledger: Vec<DailyLedger>,
    last_date: Option<NaiveDate>,
}

impl<'a> Simulator<'a> {
    pub fn new(
        config: SimulationConfig,
        dataset: &'a PriceDataset,
        schedule: &'a PositionSchedule,
        cost_model: &'a dyn TransactionCostModel,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self {
            dataset,
            schedule,
            cost_model,
            state: PortfolioState::new(config.initial_cash),
            series: PortfolioValueSeries::with_anchor(config.start, config.initial_cash),
            ledger: Vec::new(),
            last_date: None,
            config,
        })
    }

    pub fn state(&self) -> &PortfolioState {
        &self.state
    }

    pub fn series(&self) -> &PortfolioValueSeries {
        &self.series
    }

    /// Advance the portfolio through one date.
    ///
    /// On `MissingPrice` nothing is mutated and nothing is recorded.
    pub fn rebalance(&mut self, date: NaiveDate) -> Result<DailyLedger, SimulationError> {
        if let Some(last) = self.last_date {
            if date <= last {
                return Err(SimulationError::OutOfOrder { date, last });
            }
        }

        if self.state.phase() == Phase::Depleted {
            self.state.cash = 0.0;
            return Ok(self.record(DailyLedger::idle(date)));
        }

        let cash = self.state.cash;
        let legs = self.resolve_legs(date)?;

        // Fee is charged on the book as it stood coming into the day.
        let fee = holding_fee(&self.state.holdings, cash, self.config.holding_fee_rate);

        let mut returns = 0.0;
        let mut costs = 0.0;
        let mut turnover = 0.0;
        for leg in &legs {
            let delta = (leg.current - leg.target).abs();
            let ctx = TradeContext {
                symbol: &leg.symbol,
                date,
                record: leg.record,
                amount: delta * cash,
            };
            costs += self.cost_model.cost(&ctx);
            turnover += delta;
            if leg.current != 0.0 {
                returns += leg.record.pct_chg * leg.current * cash;
            }
        }

        for leg in &legs {
            self.state.holdings.set(&leg.symbol, leg.target);
        }

        let raw = cash + returns - costs - fee;
        let next = if raw.is_nan() || raw < 0.0 { 0.0 } else { raw };
        if next == 0.0 {
            warn!(%date, raw, returns, costs, fee, "portfolio depleted");
        }
        self.state.cash = next;

        debug!(
            %date,
            cash = next,
            returns,
            costs,
            fee,
            held = self.state.holdings.len(),
            "rebalanced"
        );

        Ok(self.record(DailyLedger {
            date,
            returns,
            transaction_cost: costs,
            holding_fee: fee,
            cash: next,
            turnover,
        }))
    }

    /// Walk every dataset date in `[start, end]` and finish.
    pub fn run(mut self) -> Result<SimulationResult, SimulationError> {
        let dates = self.dataset.dates_between(self.config.start, self.config.end);
        info!(
            start = %self.config.start,
            end = %self.config.end,
            dates = dates.len(),
            cost_model = self.cost_model.name(),
            "simulation started"
        );
        for date in dates {
            self.rebalance(date)?;
        }
        let result = self.finish();
        info!(
            final_cash = result.final_cash(),
            depleted = result.depleted_on.is_some(),
            "simulation finished"
        );
        Ok(result)
    }

    pub fn finish(self) -> SimulationResult {
        let depleted_on = self.ledger.iter().find(|l| l.cash == 0.0).map(|l| l.date);
        SimulationResult {
            series: self.series,
            final_holdings: self.state.holdings,
            ledger: self.ledger,
            depleted_on,
        }
    }

    fn resolve_legs(&self, date: NaiveDate) -> Result<Vec<Leg<'a>>, SimulationError> {
        let targets = self.schedule.get(date);

        let mut symbols: BTreeSet<&str> =
            self.state.holdings.symbols().map(String::as_str).collect();
        if let Some(t) = targets {
            symbols.extend(t.keys().map(String::as_str));
        }

        symbols
            .into_iter()
            .map(|symbol| {
                let dataset: &'a PriceDataset = self.dataset;
                let record = dataset.require(symbol, date)?;
                Ok(Leg {
                    symbol: symbol.to_string(),
                    record,
                    current: self.state.holdings.weight(symbol),
                    target: targets
                        .and_then(|t| t.get(symbol))
                        .copied()
                        .unwrap_or(0.0),
                })
            })
            .collect()
    }

    fn record(&mut self, entry: DailyLedger) -> DailyLedger {
        self.series.push(entry.date, entry.cash);
        self.ledger.push(entry);
        self.last_date = Some(entry.date);
        entry
    }
}

/// Convenience wrapper: build a [`Simulator`] and run it to completion.
pub fn simulate(
    config: SimulationConfig,
    dataset: &PriceDataset,
    schedule: &PositionSchedule,
    cost_model: &dyn TransactionCostModel,
) -> Result<SimulationResult, SimulationError> {
    Simulator::new(config, dataset, schedule, cost_model)?.run()
}
