//! Fixed-rate cost model: a flat fraction of the traded notional.

use super::{TradeContext, TransactionCostModel};

/// `cost = |amount| × fee_rate`, independent of market context.
#[derive(Debug, Clone)]
pub struct FixedRate {
    pub fee_rate: f64,
}

impl FixedRate {
    pub fn new(fee_rate: f64) -> Self {
        Self { fee_rate }
    }
}

impl TransactionCostModel for FixedRate {
    fn cost(&self, ctx: &TradeContext<'_>) -> f64 {
        ctx.amount.abs() * self.fee_rate
    }

    fn name(&self) -> &str {
        "fixed_rate"
    }
}
