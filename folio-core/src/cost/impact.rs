//! Proportional-impact cost model.
//!
//! `cost = (a·|x| + b·σ/√V·|x|^1.5 + c·x) / close` where `V = volume × close`.

use super::{TradeContext, TransactionCostModel};

pub(super) fn default_a() -> f64 {
    0.0005
}

pub(super) fn default_b() -> f64 {
    1.0
}

/// Linear fee plus a square-root market-impact term scaled by volatility.
#[derive(Debug, Clone)]
pub struct ProportionalImpact {
    /// Linear (spread/commission) coefficient.
    pub a: f64,
    /// Impact coefficient.
    pub b: f64,
    /// Signed linear term.
    pub c: f64,
}

impl ProportionalImpact {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }
}

impl Default for ProportionalImpact {
    fn default() -> Self {
        Self::new(default_a(), default_b(), 0.0)
    }
}

impl TransactionCostModel for ProportionalImpact {
    fn cost(&self, ctx: &TradeContext<'_>) -> f64 {
        let record = ctx.record;
        let x = ctx.amount;
        let traded_value = record.traded_value();
        // No market to trade against.
        if traded_value == 0.0 {
            return 0.0;
        }

        let sigma = record.volatility;
        let raw = self.a * x.abs()
            + self.b * sigma / traded_value.sqrt() * x.abs().powf(1.5)
            + self.c * x;
        let cost = raw / record.close;

        // Missing volatility (NaN) degrades to a zero cost.
        if cost.is_nan() {
            return 0.0;
        }
        cost
    }

    fn name(&self) -> &str {
        "proportional_impact"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceRecord;
    use chrono::NaiveDate;

    fn ctx(record: &PriceRecord, amount: f64) -> TradeContext<'_> {
        TradeContext {
            symbol: "AAA",
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            record,
            amount,
        }
    }

    #[test]
    fn zero_volume_costs_nothing() {
        let model = ProportionalImpact::default();
        let rec = PriceRecord::new(50.0, 0.01, 0.0, 2.0);
        for amount in [0.0, 1.0, 10_000.0, 5e9] {
            assert_eq!(model.cost(&ctx(&rec, amount)), 0.0);
        }
    }

    #[test]
    fn nan_volatility_costs_nothing() {
        let model = ProportionalImpact::default();
        let rec = PriceRecord::new(50.0, 0.01, 1_000.0, f64::NAN);
        assert_eq!(model.cost(&ctx(&rec, 10_000.0)), 0.0);
    }

    #[test]
    fn known_value() {
        // close 100, volume 400 → V = 40_000, √V = 200
        // a·x = 0.0005·10_000 = 5
        // b·σ/√V·x^1.5 = 1·2/200·1_000_000 = 10_000
        // (5 + 10_000) / 100 = 100.05
        let model = ProportionalImpact::default();
        let rec = PriceRecord::new(100.0, 0.0, 400.0, 2.0);
        let cost = model.cost(&ctx(&rec, 10_000.0));
        assert!((cost - 100.05).abs() < 1e-9, "got {cost}");
    }

    #[test]
    fn linear_only_when_impact_disabled() {
        let model = ProportionalImpact::new(0.001, 0.0, 0.0);
        let rec = PriceRecord::new(20.0, 0.0, 1_000.0, 3.0);
        // 0.001 · 5_000 / 20
        assert!((model.cost(&ctx(&rec, 5_000.0)) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn zero_amount_zero_cost() {
        let model = ProportionalImpact::default();
        let rec = PriceRecord::new(20.0, 0.0, 1_000.0, 3.0);
        assert_eq!(model.cost(&ctx(&rec, 0.0)), 0.0);
    }
}
