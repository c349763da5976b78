//! Domain types for the portfolio simulator.

pub mod holdings;
pub mod record;
pub mod schedule;
pub mod series;

pub use holdings::{Holdings, Weights};
pub use record::PriceRecord;
pub use schedule::PositionSchedule;
pub use series::{PortfolioValueSeries, ValuePoint};

/// Symbol type alias
pub type Symbol = String;
