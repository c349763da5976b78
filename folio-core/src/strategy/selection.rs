//! Built-in selectors.

use super::{Pick, Selector, Side};
use crate::data::PriceDataset;
use crate::domain::Symbol;
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Top-N symbols by ranking score on each date.
///
/// Symbols without a score (NaN) on the date are not eligible. Equal scores are
/// broken by symbol name ascending. Every pick is declared long.
#[derive(Debug, Clone)]
pub struct TopNSelector {
    pub n: usize,
}

impl TopNSelector {
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl Selector for TopNSelector {
    fn select(&self, dataset: &PriceDataset, date: NaiveDate) -> Vec<Pick> {
        let mut scored: Vec<(&Symbol, f64)> = dataset
            .symbols_on(date)
            .iter()
            .filter_map(|s| {
                let score = dataset.record(s, date)?.score;
                (!score.is_nan()).then_some((s, score))
            })
            .collect();

        scored.sort_by(|(sa, a), (sb, b)| {
            b.partial_cmp(a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| sa.cmp(sb))
        });

        scored
            .into_iter()
            .take(self.n)
            .map(|(s, _)| Pick::long(s.clone()))
            .collect()
    }

    fn name(&self) -> &str {
        "top_n"
    }
}

/// The same declared long/short book on every date.
///
/// Symbols without a record on a date are skipped for that date.
#[derive(Debug, Clone)]
pub struct FixedSelector {
    picks: Vec<Pick>,
}

impl FixedSelector {
    pub fn new(picks: Vec<Pick>) -> Self {
        Self { picks }
    }

    /// Longs first, then shorts, each in the given order.
    pub fn long_short(longs: &[&str], shorts: &[&str]) -> Self {
        let picks = longs
            .iter()
            .map(|s| Pick::long(*s))
            .chain(shorts.iter().map(|s| Pick::short(*s)))
            .collect();
        Self { picks }
    }

    pub fn picks(&self) -> &[Pick] {
        &self.picks
    }

    pub fn count(&self, side: Side) -> usize {
        self.picks.iter().filter(|p| p.side == side).count()
    }
}

impl Selector for FixedSelector {
    fn select(&self, dataset: &PriceDataset, date: NaiveDate) -> Vec<Pick> {
        self.picks
            .iter()
            .filter(|p| dataset.record(&p.symbol, date).is_some())
            .cloned()
            .collect()
    }

    fn name(&self) -> &str {
        "fixed"
    }
}
