//! Short-position holding fees.

use crate::domain::Holdings;

/// Trading days used to de-annualize rates.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Daily accrual factor for an annual rate: `(1 + r)^(1/252) − 1`.
pub fn daily_fee_factor(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / TRADING_DAYS_PER_YEAR) - 1.0
}

/// Fee owed for one day on the short side of `holdings`.
///
/// `cash` is the balance before the day's rebalance. Long and flat holdings
/// accrue nothing.
pub fn holding_fee(holdings: &Holdings, cash: f64, annual_rate: f64) -> f64 {
    holdings.short_exposure() * cash * daily_fee_factor(annual_rate)
}
