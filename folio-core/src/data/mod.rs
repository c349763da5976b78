//! Price dataset and derived features.
//!
//! The dataset is an immutable, indexed table built once from whatever the
//! loader hands over. The simulator and strategies only ever read from it.

pub mod dataset;
pub mod features;

pub use dataset::{Observation, PriceDataset, PriceDatasetBuilder};
pub use features::FeatureWindows;

use chrono::NaiveDate;
use thiserror::Error;

/// Structured errors for dataset construction and lookup.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("duplicate record for {symbol} on {date}")]
    DuplicateRecord { symbol: String, date: NaiveDate },

    #[error("invalid record for {symbol} on {date}: {reason}")]
    InvalidRecord {
        symbol: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("no price record for {symbol} on {date}")]
    MissingRecord { symbol: String, date: NaiveDate },

    #[error("schedule references {symbol} on {date}, which the dataset does not contain")]
    UnknownScheduleSymbol { symbol: String, date: NaiveDate },

    #[error("invalid feature window: {0}")]
    InvalidWindow(String),
}
