//! PositionStrategy: selection, weighting and a leverage limit composed into a PositionSchedule.

use super::{Selector, Weighting, WeightingContext, WeightingError};
use crate::data::PriceDataset;
use crate::domain::{PositionSchedule, Weights};
use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::debug;

/// A composed two-stage strategy.
///
/// Dates are independent of each other, so `schedule()` may evaluate them on the
/// rayon pool. The resulting schedule is identical either way.
pub struct PositionStrategy {
    selector: Box<dyn Selector>,
    weighting: Box<dyn Weighting>,
    leverage: f64,
    parallel: bool,
}

impl PositionStrategy {
    pub fn new(
        selector: Box<dyn Selector>,
        weighting: Box<dyn Weighting>,
        leverage: f64,
    ) -> Result<Self, WeightingError> {
        if !leverage.is_finite() || leverage < 0.0 {
            return Err(WeightingError::InvalidLeverage(leverage));
        }
        Ok(Self {
            selector,
            weighting,
            leverage,
            parallel: true,
        })
    }

    /// Enables or disables parallel evaluation of dates.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn leverage(&self) -> f64 {
        self.leverage
    }

    pub fn selector_name(&self) -> &str {
        self.selector.name()
    }

    pub fn weighting_name(&self) -> &str {
        self.weighting.name()
    }

    /// Target weights for a single date.
    pub fn weights_on(
        &self,
        dataset: &PriceDataset,
        date: NaiveDate,
    ) -> Result<Weights, WeightingError> {
        let picks = self.selector.select(dataset, date);
        let ctx = WeightingContext {
            dataset,
            date,
            leverage: self.leverage,
        };
        self.weighting.weights(&picks, &ctx)
    }

    /// Evaluate every date and collect the schedule.
    ///
    /// The first failing date (in date order) is reported.
    pub fn schedule(
        &self,
        dataset: &PriceDataset,
        dates: &[NaiveDate],
    ) -> Result<PositionSchedule, WeightingError> {
        debug!(
            selector = self.selector.name(),
            weighting = self.weighting.name(),
            dates = dates.len(),
            parallel = self.parallel,
            "building position schedule"
        );

        let per_date: Vec<Result<(NaiveDate, Weights), WeightingError>> = if self.parallel {
            dates
                .par_iter()
                .map(|&date| self.weights_on(dataset, date).map(|w| (date, w)))
                .collect()
        } else {
            dates
                .iter()
                .map(|&date| self.weights_on(dataset, date).map(|w| (date, w)))
                .collect()
        };

        per_date.into_iter().collect()
    }
}

impl std::fmt::Debug for PositionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionStrategy")
            .field("selector", &self.selector.name())
            .field("weighting", &self.weighting.name())
            .field("leverage", &self.leverage)
            .field("parallel", &self.parallel)
            .finish()
    }
}
