//! PortfolioValueSeries — cash per simulated date, plus the pre-trade anchor.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One (date, cash) observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub cash: f64,
}

/// Append-only portfolio value history.
///
/// Point 0 is always the anchor: the start date paired with initial cash. It
/// may share its date with the first simulated point; both are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValueSeries {
    points: Vec<ValuePoint>,
}

impl PortfolioValueSeries {
    pub fn with_anchor(start: NaiveDate, initial_cash: f64) -> Self {
        Self {
            points: vec![ValuePoint {
                date: start,
                cash: initial_cash,
            }],
        }
    }

    pub(crate) fn push(&mut self, date: NaiveDate, cash: f64) {
        self.points.push(ValuePoint { date, cash });
    }

    pub fn anchor(&self) -> ValuePoint {
        self.points[0]
    }

    pub fn points(&self) -> &[ValuePoint] {
        &self.points
    }

    /// Cash values in order, anchor first.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.cash).collect()
    }

    pub fn last(&self) -> ValuePoint {
        self.points[self.points.len() - 1]
    }

    /// Number of points, anchor included.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: the anchor is present from construction.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Date of the first zero-cash point, if the portfolio was depleted.
    pub fn depleted_on(&self) -> Option<NaiveDate> {
        self.points.iter().find(|p| p.cash == 0.0).map(|p| p.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn anchor_is_first_point() {
        let mut s = PortfolioValueSeries::with_anchor(d(1), 1_000.0);
        s.push(d(1), 990.0);
        s.push(d(4), 1_010.0);
        assert_eq!(s.anchor().cash, 1_000.0);
        assert_eq!(s.len(), 3);
        assert_eq!(s.values(), vec![1_000.0, 990.0, 1_010.0]);
        assert_eq!(s.last().date, d(4));
    }

    #[test]
    fn depletion_date() {
        let mut s = PortfolioValueSeries::with_anchor(d(1), 1_000.0);
        assert_eq!(s.depleted_on(), None);
        s.push(d(4), 0.0);
        s.push(d(5), 0.0);
        assert_eq!(s.depleted_on(), Some(d(4)));
    }
}
