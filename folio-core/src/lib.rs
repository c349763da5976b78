//! Folio Core — domain types, price dataset, cost models, position strategies, simulator.
//!
//! This crate contains the pieces a backtest is assembled from:
//! - Domain types (price records, holdings, schedules, value series)
//! - An immutable price dataset with derived features
//! - Pluggable transaction cost models
//! - Two-stage position strategies (selection, then weighting under a leverage cap)
//! - The sequential portfolio simulator

pub mod cost;
pub mod data;
pub mod domain;
pub mod engine;
pub mod strategy;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything shared across sweep workers is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::PriceRecord>();
        require_sync::<domain::PriceRecord>();
        require_send::<domain::Holdings>();
        require_sync::<domain::Holdings>();
        require_send::<domain::PositionSchedule>();
        require_sync::<domain::PositionSchedule>();
        require_send::<domain::PortfolioValueSeries>();
        require_sync::<domain::PortfolioValueSeries>();

        // Data
        require_send::<data::PriceDataset>();
        require_sync::<data::PriceDataset>();

        // Strategy and cost seams
        require_send::<strategy::PositionStrategy>();
        require_sync::<strategy::PositionStrategy>();
        require_send::<Box<dyn cost::TransactionCostModel>>();
        require_sync::<Box<dyn cost::TransactionCostModel>>();
        require_send::<cost::CostModelConfig>();
        require_sync::<cost::CostModelConfig>();

        // Engine output
        require_send::<engine::SimulationResult>();
        require_sync::<engine::SimulationResult>();
        require_send::<engine::DailyLedger>();
        require_sync::<engine::DailyLedger>();
    }
}
