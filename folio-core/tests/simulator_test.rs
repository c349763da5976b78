//! Integration tests for the portfolio simulator.
//!
//! Tests:
//! 1. Entering a position at zero cost leaves cash unchanged
//! 2. Short holding fee accrual
//! 3. Realized returns on held weights
//! 4. Depletion is terminal and cash never goes negative
//! 5. Missing price records are fatal
//! 6. Identical inputs give identical outputs
//! 7. Strategy → schedule → simulator end to end

use chrono::NaiveDate;
use folio_core::cost::{CostModelConfig, FixedRate, ProportionalImpact};
use folio_core::data::{PriceDataset, PriceDatasetBuilder};
use folio_core::domain::{PositionSchedule, PriceRecord, Weights};
use folio_core::engine::{simulate, SimulationConfig, SimulationError};
use folio_core::strategy::{PositionStrategy, TopNSelector, WeightingScheme};

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 2, day).unwrap()
}

fn weights(pairs: &[(&str, f64)]) -> Weights {
    pairs.iter().map(|(s, w)| (s.to_string(), *w)).collect()
}

/// Every symbol on every day: close 50, given pct_chg, volume 10k, vol 1.
fn dataset_with_returns(symbols: &[&str], days: u32, pct_chg: f64) -> PriceDataset {
    let mut b = PriceDatasetBuilder::new();
    for day in 1..=days {
        for s in symbols {
            b.push(s, d(day), PriceRecord::new(50.0, pct_chg, 10_000.0, 1.0))
                .unwrap();
        }
    }
    b.build()
}

// ── 1. Zero-cost entry ───────────────────────────────────────────────

#[test]
fn zero_cost_entry_keeps_cash() {
    let ds = dataset_with_returns(&["SYM"], 1, 0.0);
    let mut schedule = PositionSchedule::new();
    schedule.insert(d(1), weights(&[("SYM", 0.5)]));

    let model = ProportionalImpact::new(0.0, 0.0, 0.0);
    let result = simulate(SimulationConfig::new(d(1), d(1)), &ds, &schedule, &model).unwrap();

    assert_eq!(result.series.values(), vec![1_000_000.0, 1_000_000.0]);
    assert_eq!(result.final_holdings.len(), 1);
    assert_eq!(result.final_holdings.weight("SYM"), 0.5);
}

#[test]
fn anchor_shares_start_date_with_first_point() {
    let ds = dataset_with_returns(&["SYM"], 2, 0.0);
    let schedule = PositionSchedule::new();
    let model = FixedRate::new(0.0);
    let result = simulate(SimulationConfig::new(d(1), d(2)), &ds, &schedule, &model).unwrap();
    let points = result.series.points();
    assert_eq!(points.len(), 3);
    assert_eq!(points[0].date, d(1));
    assert_eq!(points[1].date, d(1));
    assert_eq!(points[2].date, d(2));
}

// ── 2. Holding fee ───────────────────────────────────────────────────

#[test]
fn short_position_accrues_daily_fee() {
    let ds = dataset_with_returns(&["SHRT"], 2, 0.0);
    let mut schedule = PositionSchedule::new();
    schedule.insert(d(1), weights(&[("SHRT", -0.2)]));
    schedule.insert(d(2), weights(&[("SHRT", -0.2)]));

    let model = FixedRate::new(0.0);
    let cfg = SimulationConfig::new(d(1), d(2)).with_holding_fee_rate(0.03);
    let result = simulate(cfg, &ds, &schedule, &model).unwrap();

    // Nothing was held coming into day 1, so the fee starts on day 2.
    assert_eq!(result.ledger[0].holding_fee, 0.0);
    let expected = 0.2 * 1_000_000.0 * (1.03f64.powf(1.0 / 252.0) - 1.0);
    assert!((result.ledger[1].holding_fee - expected).abs() < 1e-9);
    assert!((result.final_cash() - (1_000_000.0 - expected)).abs() < 1e-6);
}

#[test]
fn long_positions_pay_no_fee() {
    let ds = dataset_with_returns(&["LONG"], 3, 0.0);
    let schedule: PositionSchedule = (1..=3).map(|day| (d(day), weights(&[("LONG", 0.5)]))).collect();
    let model = FixedRate::new(0.0);
    let result = simulate(SimulationConfig::new(d(1), d(3)), &ds, &schedule, &model).unwrap();
    assert_eq!(result.total_holding_fees(), 0.0);
}

// ── 3. Returns ───────────────────────────────────────────────────────

#[test]
fn held_weight_earns_pct_change() {
    let ds = dataset_with_returns(&["UP"], 2, 0.10);
    let schedule: PositionSchedule = (1..=2).map(|day| (d(day), weights(&[("UP", 0.5)]))).collect();
    let model = FixedRate::new(0.0);
    let result = simulate(SimulationConfig::new(d(1), d(2)), &ds, &schedule, &model).unwrap();

    // Day 1 only enters; day 2 realizes 0.10 × 0.5 × cash.
    assert_eq!(result.ledger[0].returns, 0.0);
    assert!((result.final_cash() - 1_050_000.0).abs() < 1e-6);
}

#[test]
fn short_weight_gains_when_price_falls() {
    let ds = dataset_with_returns(&["DOWN"], 2, -0.10);
    let schedule: PositionSchedule =
        (1..=2).map(|day| (d(day), weights(&[("DOWN", -0.5)]))).collect();
    let model = FixedRate::new(0.0);
    let cfg = SimulationConfig::new(d(1), d(2)).with_holding_fee_rate(0.0);
    let result = simulate(cfg, &ds, &schedule, &model).unwrap();
    assert!((result.final_cash() - 1_050_000.0).abs() < 1e-6);
}

// ── 4. Depletion ─────────────────────────────────────────────────────

#[test]
fn depletion_is_terminal_and_non_negative() {
    let ds = dataset_with_returns(&["A"], 6, 0.0);
    // Flip between +1 and −1 every day; turnover cost of 2 × cash × 0.6 wipes the book.
    let schedule: PositionSchedule = (1..=6)
        .map(|day| {
            let w = if day % 2 == 0 { -1.0 } else { 1.0 };
            (d(day), weights(&[("A", w)]))
        })
        .collect();
    let model = FixedRate::new(0.6);
    let result = simulate(SimulationConfig::new(d(1), d(6)), &ds, &schedule, &model).unwrap();

    let values = result.series.values();
    assert!(values.iter().all(|v| *v >= 0.0));
    let first_zero = values.iter().position(|v| *v == 0.0).unwrap();
    assert!(values[first_zero..].iter().all(|v| *v == 0.0));
    assert_eq!(result.depleted_on, Some(d(2)));
    // Depleted days change nothing, holdings included.
    assert_eq!(result.ledger[3].transaction_cost, 0.0);
}

#[test]
fn nan_return_clamps_to_depleted() {
    let mut b = PriceDatasetBuilder::new();
    b.push("A", d(1), PriceRecord::new(50.0, 0.0, 10.0, 1.0)).unwrap();
    b.push("A", d(2), PriceRecord::new(50.0, f64::NAN, 10.0, 1.0)).unwrap();
    b.push("A", d(3), PriceRecord::new(50.0, 0.0, 10.0, 1.0)).unwrap();
    let ds = b.build();
    let schedule: PositionSchedule = (1..=3).map(|day| (d(day), weights(&[("A", 0.5)]))).collect();
    let model = FixedRate::new(0.0);
    let result = simulate(SimulationConfig::new(d(1), d(3)), &ds, &schedule, &model).unwrap();
    assert_eq!(result.series.values(), vec![1_000_000.0, 1_000_000.0, 0.0, 0.0]);
}

// ── 5. Missing data ──────────────────────────────────────────────────

#[test]
fn missing_price_is_fatal() {
    let mut b = PriceDatasetBuilder::new();
    b.push("A", d(1), PriceRecord::new(50.0, 0.0, 10.0, 1.0)).unwrap();
    b.push("A", d(2), PriceRecord::new(50.0, 0.0, 10.0, 1.0)).unwrap();
    b.push("B", d(1), PriceRecord::new(50.0, 0.0, 10.0, 1.0)).unwrap();
    let ds = b.build();

    // B is held from day 1 and has no record on day 2.
    let mut schedule = PositionSchedule::new();
    schedule.insert(d(1), weights(&[("B", 0.3)]));
    schedule.insert(d(2), weights(&[("A", 0.3)]));

    let model = FixedRate::new(0.0);
    let err = simulate(SimulationConfig::new(d(1), d(2)), &ds, &schedule, &model).unwrap_err();
    match err {
        SimulationError::MissingPrice { symbol, date } => {
            assert_eq!(symbol, "B");
            assert_eq!(date, d(2));
        }
        other => panic!("expected MissingPrice, got {other}"),
    }
}

// ── 6. Idempotence ───────────────────────────────────────────────────

#[test]
fn identical_inputs_identical_outputs() {
    let ds = scored_dataset();
    let model = CostModelConfig::default().build();
    let strategy = PositionStrategy::new(
        Box::new(TopNSelector::new(3)),
        WeightingScheme::Rank.build(),
        0.5,
    )
    .unwrap();
    let dates: Vec<_> = ds.dates().collect();
    let schedule = strategy.schedule(&ds, &dates).unwrap();

    let cfg = SimulationConfig::new(d(1), d(20));
    let a = simulate(cfg.clone(), &ds, &schedule, model.as_ref()).unwrap();
    let b = simulate(cfg, &ds, &schedule, model.as_ref()).unwrap();
    assert_eq!(a, b);
}

// ── 7. End to end ────────────────────────────────────────────────────

fn scored_dataset() -> PriceDataset {
    let mut b = PriceDatasetBuilder::new();
    let symbols = ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF"];
    for day in 1..=20u32 {
        for (i, s) in symbols.iter().enumerate() {
            let phase = day as f64 * 0.3 + i as f64;
            let pct = 0.01 * phase.sin();
            let close = 20.0 + 5.0 * i as f64 + phase.cos();
            let record = PriceRecord::new(close, pct, 50_000.0 + 1_000.0 * i as f64, 0.5 + 0.1 * i as f64)
                .with_score(phase.cos());
            b.push(s, d(day), record).unwrap();
        }
    }
    b.build()
}

#[test]
fn strategy_schedule_runs_through_simulator() {
    let ds = scored_dataset();
    let dates: Vec<_> = ds.dates().collect();
    for scheme in [WeightingScheme::Rank, WeightingScheme::Uniform, WeightingScheme::RiskParity] {
        let strategy =
            PositionStrategy::new(Box::new(TopNSelector::new(4)), scheme.build(), 0.5).unwrap();
        let schedule = strategy.schedule(&ds, &dates).unwrap();
        schedule.validate_against(&ds).unwrap();

        let model = CostModelConfig::default().build();
        let result =
            simulate(SimulationConfig::new(d(1), d(20)), &ds, &schedule, model.as_ref()).unwrap();

        assert_eq!(result.series.len(), 21);
        assert!(result.total_transaction_cost() > 0.0);
        assert!(result.final_holdings.gross_exposure() <= 0.5 + 1e-9);
        assert!(result.depleted_on.is_none());
    }
}
