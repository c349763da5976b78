//! PriceDataset — read-only (symbol, date) → PriceRecord table.

use super::features::{pct_change, rolling_sharpe, rolling_std, FeatureWindows};
use super::DataError;
use crate::domain::{PriceRecord, Symbol};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// One row as delivered by a loader, before missing columns are derived.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
    pub pct_chg: Option<f64>,
    pub volatility: Option<f64>,
    pub score: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, close: f64, volume: f64) -> Self {
        Self {
            date,
            close,
            volume,
            pct_chg: None,
            volatility: None,
            score: None,
        }
    }
}

/// Accumulates records and freezes them into a [`PriceDataset`].
#[derive(Debug, Default)]
pub struct PriceDatasetBuilder {
    records: BTreeMap<Symbol, BTreeMap<NaiveDate, PriceRecord>>,
}

impl PriceDatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fully specified record.
    pub fn push(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        record: PriceRecord,
    ) -> Result<(), DataError> {
        if !record.close.is_finite() || record.close <= 0.0 {
            return Err(DataError::InvalidRecord {
                symbol: symbol.to_string(),
                date,
                reason: format!("close must be positive, got {}", record.close),
            });
        }
        if record.volume.is_nan() || record.volume < 0.0 {
            return Err(DataError::InvalidRecord {
                symbol: symbol.to_string(),
                date,
                reason: format!("volume must be non-negative, got {}", record.volume),
            });
        }

        let by_date = self.records.entry(symbol.to_string()).or_default();
        if by_date.contains_key(&date) {
            return Err(DataError::DuplicateRecord {
                symbol: symbol.to_string(),
                date,
            });
        }
        by_date.insert(date, record);
        Ok(())
    }

    /// Add a symbol's history, deriving any column the observations leave empty.
    ///
    /// Derivation runs over the symbol's own rows in date order: percentage
    /// change of close, rolling std of close over `windows.volatility`, and
    /// rolling Sharpe of daily returns over `windows.score`.
    pub fn push_observations(
        &mut self,
        symbol: &str,
        mut observations: Vec<Observation>,
        windows: &FeatureWindows,
    ) -> Result<(), DataError> {
        if windows.volatility < 2 || windows.score < 2 {
            return Err(DataError::InvalidWindow(format!(
                "windows must be at least 2 (volatility={}, score={})",
                windows.volatility, windows.score
            )));
        }
        observations.sort_by_key(|o| o.date);

        let closes: Vec<f64> = observations.iter().map(|o| o.close).collect();
        let derived_pct = pct_change(&closes);
        let returns: Vec<f64> = observations
            .iter()
            .zip(&derived_pct)
            .map(|(o, d)| o.pct_chg.unwrap_or(*d))
            .collect();
        let derived_vol = rolling_std(&closes, windows.volatility);
        let derived_score = rolling_sharpe(&returns, windows.score);

        for (i, obs) in observations.iter().enumerate() {
            let record = PriceRecord {
                close: obs.close,
                pct_chg: returns[i],
                volume: obs.volume,
                volatility: obs.volatility.unwrap_or(derived_vol[i]),
                score: obs.score.unwrap_or(derived_score[i]),
            };
            self.push(symbol, obs.date, record)?;
        }
        Ok(())
    }

    pub fn build(self) -> PriceDataset {
        let mut calendar: BTreeMap<NaiveDate, Vec<Symbol>> = BTreeMap::new();
        for (symbol, by_date) in &self.records {
            for date in by_date.keys() {
                calendar.entry(*date).or_default().push(symbol.clone());
            }
        }
        PriceDataset {
            records: self.records,
            calendar,
        }
    }
}

/// Immutable price table indexed by symbol and by date.
///
/// Symbols within a date are kept in ascending order.
#[derive(Debug, Clone, Default)]
pub struct PriceDataset {
    records: BTreeMap<Symbol, BTreeMap<NaiveDate, PriceRecord>>,
    calendar: BTreeMap<NaiveDate, Vec<Symbol>>,
}

impl PriceDataset {
    pub fn record(&self, symbol: &str, date: NaiveDate) -> Option<&PriceRecord> {
        self.records.get(symbol).and_then(|m| m.get(&date))
    }

    /// Like [`record`](Self::record) but a missing pair is an error.
    pub fn require(&self, symbol: &str, date: NaiveDate) -> Result<&PriceRecord, DataError> {
        self.record(symbol, date)
            .ok_or_else(|| DataError::MissingRecord {
                symbol: symbol.to_string(),
                date,
            })
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.records.keys()
    }

    /// Symbols that have a record on `date`.
    pub fn symbols_on(&self, date: NaiveDate) -> &[Symbol] {
        self.calendar
            .get(&date)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Union of all dates, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.calendar.keys().copied()
    }

    /// Dates within `[start, end]`, ascending.
    pub fn dates_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        if start > end {
            return Vec::new();
        }
        self.calendar.range(start..=end).map(|(d, _)| *d).collect()
    }

    /// A symbol's full history in date order.
    pub fn history(&self, symbol: &str) -> impl Iterator<Item = (NaiveDate, &PriceRecord)> {
        self.records
            .get(symbol)
            .into_iter()
            .flat_map(|m| m.iter().map(|(d, r)| (*d, r)))
    }

    pub fn symbol_count(&self) -> usize {
        self.records.len()
    }

    pub fn date_count(&self) -> usize {
        self.calendar.len()
    }

    pub fn record_count(&self) -> usize {
        self.records.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
