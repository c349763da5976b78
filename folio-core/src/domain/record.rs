//! PriceRecord — one symbol on one date, as handed over by the dataset.

use serde::{Deserialize, Serialize};

/// Market snapshot for a single symbol on a single date.
///
/// `pct_chg` is NaN on a symbol's first observation, `volatility` is NaN until
/// the rolling window fills, and `score` is NaN when no ranking signal exists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub close: f64,
    pub pct_chg: f64,
    /// Traded units.
    pub volume: f64,
    /// Rolling standard deviation of close.
    pub volatility: f64,
    pub score: f64,
}

impl PriceRecord {
    pub fn new(close: f64, pct_chg: f64, volume: f64, volatility: f64) -> Self {
        Self {
            close,
            pct_chg,
            volume,
            volatility,
            score: f64::NAN,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    /// Traded value: volume × close.
    pub fn traded_value(&self) -> f64 {
        self.volume * self.close
    }

    /// True when the volatility estimate can be inverted.
    pub fn has_usable_volatility(&self) -> bool {
        self.volatility.is_finite() && self.volatility > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traded_value_is_volume_times_close() {
        let rec = PriceRecord::new(25.0, 0.01, 4_000.0, 1.2);
        assert_eq!(rec.traded_value(), 100_000.0);
    }

    #[test]
    fn score_defaults_to_nan() {
        let rec = PriceRecord::new(25.0, 0.01, 4_000.0, 1.2);
        assert!(rec.score.is_nan());
        assert_eq!(rec.with_score(0.7).score, 0.7);
    }

    #[test]
    fn volatility_usability() {
        assert!(PriceRecord::new(10.0, 0.0, 1.0, 0.5).has_usable_volatility());
        assert!(!PriceRecord::new(10.0, 0.0, 1.0, 0.0).has_usable_volatility());
        assert!(!PriceRecord::new(10.0, 0.0, 1.0, f64::NAN).has_usable_volatility());
    }
}
