//! PositionSchedule — target weights per date, produced once per backtest.

use super::Weights;
use crate::data::{DataError, PriceDataset};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered mapping date → (symbol → signed target weight).
///
/// Built before the simulation starts and read-only while it runs. A date with
/// no entry means "hold nothing" to the simulator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSchedule {
    entries: BTreeMap<NaiveDate, Weights>,
}

impl PositionSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the targets for a date.
    pub fn insert(&mut self, date: NaiveDate, weights: Weights) {
        self.entries.insert(date, weights);
    }

    /// Targets for a date, if the schedule has an entry for it.
    pub fn get(&self, date: NaiveDate) -> Option<&Weights> {
        self.entries.get(&date)
    }

    /// Target weight for one symbol on one date (0.0 when absent).
    pub fn target(&self, date: NaiveDate, symbol: &str) -> f64 {
        self.entries
            .get(&date)
            .and_then(|w| w.get(symbol))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &Weights)> {
        self.entries.iter().map(|(d, w)| (*d, w))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Largest Σ|weight| over all dates.
    pub fn max_gross_exposure(&self) -> f64 {
        self.entries
            .values()
            .map(|w| w.values().map(|v| v.abs()).sum::<f64>())
            .fold(0.0, f64::max)
    }

    /// Check that every scheduled symbol has a price record on its date.
    pub fn validate_against(&self, dataset: &PriceDataset) -> Result<(), DataError> {
        for (date, weights) in &self.entries {
            for symbol in weights.keys() {
                if dataset.record(symbol, *date).is_none() {
                    return Err(DataError::UnknownScheduleSymbol {
                        symbol: symbol.clone(),
                        date: *date,
                    });
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<(NaiveDate, Weights)> for PositionSchedule {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, Weights)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PriceDatasetBuilder;
    use crate::domain::PriceRecord;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn weights(pairs: &[(&str, f64)]) -> Weights {
        pairs.iter().map(|(s, w)| (s.to_string(), *w)).collect()
    }

    #[test]
    fn absent_symbol_targets_zero() {
        let mut s = PositionSchedule::new();
        s.insert(d(4), weights(&[("AAA", 0.2)]));
        assert_eq!(s.target(d(4), "AAA"), 0.2);
        assert_eq!(s.target(d(4), "BBB"), 0.0);
        assert_eq!(s.target(d(5), "AAA"), 0.0);
    }

    #[test]
    fn dates_are_ordered() {
        let s: PositionSchedule = vec![
            (d(6), weights(&[("AAA", 0.1)])),
            (d(4), weights(&[("AAA", 0.1)])),
        ]
        .into_iter()
        .collect();
        let dates: Vec<_> = s.dates().collect();
        assert_eq!(dates, vec![d(4), d(6)]);
    }

    #[test]
    fn max_gross_exposure_over_dates() {
        let mut s = PositionSchedule::new();
        s.insert(d(4), weights(&[("AAA", 0.2), ("BBB", -0.2)]));
        s.insert(d(5), weights(&[("AAA", 0.1)]));
        assert!((s.max_gross_exposure() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_symbol_missing_from_dataset() {
        let mut b = PriceDatasetBuilder::new();
        b.push("AAA", d(4), PriceRecord::new(10.0, 0.0, 100.0, 1.0))
            .unwrap();
        let ds = b.build();

        let mut s = PositionSchedule::new();
        s.insert(d(4), weights(&[("AAA", 0.2)]));
        assert!(s.validate_against(&ds).is_ok());

        s.insert(d(4), weights(&[("BBB", 0.2)]));
        let err = s.validate_against(&ds).unwrap_err();
        assert!(matches!(err, DataError::UnknownScheduleSymbol { .. }));
    }
}
