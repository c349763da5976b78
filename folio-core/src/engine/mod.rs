//! Portfolio simulator — the day-by-day cash and holdings fold.
//!
//! Per date, in order:
//! 1. Depleted portfolios record zero and stop changing
//! 2. Every held or targeted symbol is looked up before anything mutates
//! 3. Turnover costs and realized returns accumulate, holdings move to target
//! 4. Short holding fees accrue on pre-rebalance weights
//! 5. Cash is clamped at zero and appended to the value series

pub mod fees;
pub mod simulator;
pub mod state;

pub use fees::{daily_fee_factor, holding_fee, TRADING_DAYS_PER_YEAR};
pub use simulator::{simulate, SimulationConfig, SimulationError, SimulationResult, Simulator};
pub use state::{DailyLedger, Phase, PortfolioState};
