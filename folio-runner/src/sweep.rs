//! Parameter sweeps over leverage, top-N, weighting, and cost model.
//!
//! Every grid point shares the same loaded dataset by reference; each run owns
//! its own simulator state, so points evaluate independently on the rayon pool.

use rayon::prelude::*;
use std::collections::HashMap;
use tracing::info;

use folio_core::cost::CostModelConfig;
use folio_core::strategy::WeightingScheme;

use crate::config::BacktestConfig;
use crate::data_loader::LoadedData;
use crate::runner::{run_backtest_from_data, BacktestResult, RunError};

/// Parameter grid. An empty axis keeps the base config's value.
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    pub leverage_limits: Vec<f64>,
    pub top_ns: Vec<usize>,
    pub weightings: Vec<WeightingScheme>,
    pub cost_models: Vec<CostModelConfig>,
}

impl ParamGrid {
    /// Returns the total number of configurations in this grid.
    pub fn size(&self) -> usize {
        [
            self.leverage_limits.len(),
            self.top_ns.len(),
            self.weightings.len(),
            self.cost_models.len(),
        ]
        .iter()
        .map(|&n| n.max(1))
        .product()
    }

    /// Generates all configurations in the grid.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let leverages = axis(&self.leverage_limits, base.strategy.leverage_limit);
        let top_ns = axis(&self.top_ns, base.strategy.top_n);
        let weightings = axis(&self.weightings, base.strategy.weighting);
        let cost_models = axis(&self.cost_models, base.cost_model.clone());

        let mut configs = Vec::with_capacity(self.size());
        for &leverage in &leverages {
            for &top_n in &top_ns {
                for &weighting in &weightings {
                    for cost_model in &cost_models {
                        let mut config = base.clone();
                        config.strategy.leverage_limit = leverage;
                        config.strategy.top_n = top_n;
                        config.strategy.weighting = weighting;
                        config.cost_model = cost_model.clone();
                        // Points already run in parallel.
                        config.strategy.parallel = false;
                        configs.push(config);
                    }
                }
            }
        }
        configs
    }
}

fn axis<T: Clone>(values: &[T], fallback: T) -> Vec<T> {
    if values.is_empty() {
        vec![fallback]
    } else {
        values.to_vec()
    }
}

/// Parameter sweep executor.
///
/// Runs backtests for all configurations in a grid, optionally in parallel.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Executes a parameter sweep over the given grid.
    ///
    /// The first failing configuration aborts the sweep.
    pub fn sweep(
        &self,
        grid: &ParamGrid,
        base: &BacktestConfig,
        loaded: &LoadedData,
    ) -> Result<SweepResults, RunError> {
        let configs = grid.generate_configs(base);
        for config in &configs {
            config.validate()?;
        }
        info!(
            points = configs.len(),
            parallel = self.parallel,
            "starting parameter sweep"
        );

        let results: Vec<BacktestResult> = if self.parallel {
            configs
                .par_iter()
                .map(|config| run_backtest_from_data(config, loaded))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            configs
                .iter()
                .map(|config| run_backtest_from_data(config, loaded))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(SweepResults::new(results))
    }
}

/// Results from a parameter sweep, in grid order.
#[derive(Debug)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
    by_run_id: HashMap<String, usize>,
}

impl SweepResults {
    fn new(results: Vec<BacktestResult>) -> Self {
        let by_run_id = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.clone(), i))
            .collect();
        Self { results, by_run_id }
    }

    /// Returns all results as a slice.
    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Gets a result by RunId.
    pub fn get(&self, run_id: &str) -> Option<&BacktestResult> {
        self.by_run_id.get(run_id).map(|&i| &self.results[i])
    }

    /// Returns results sorted by Sharpe ratio (descending).
    pub fn sorted_by_sharpe(&self) -> Vec<&BacktestResult> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| b.metrics.sharpe.total_cmp(&a.metrics.sharpe));
        sorted
    }

    /// Returns the top N results by Sharpe ratio.
    pub fn top_n(&self, n: usize) -> Vec<&BacktestResult> {
        self.sorted_by_sharpe().into_iter().take(n).collect()
    }

    pub fn best(&self) -> Option<&BacktestResult> {
        self.sorted_by_sharpe().into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataSection;
    use crate::data_loader::generate_synthetic;
    use crate::config::DataSourceKind;
    use chrono::NaiveDate;
    use folio_core::data::FeatureWindows;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, m, day).unwrap()
    }

    fn base_config() -> BacktestConfig {
        let symbols = (0..8).map(|i| format!("SYN{i}")).collect();
        let mut config = BacktestConfig::new(d(3, 1), d(6, 30), DataSection::synthetic(symbols, 11));
        config.data.windows = FeatureWindows {
            volatility: 20,
            score: 20,
        };
        config.strategy.top_n = 4;
        config
    }

    fn loaded(config: &BacktestConfig) -> LoadedData {
        let ds = generate_synthetic(
            &config.data.symbols,
            d(1, 1),
            d(6, 30),
            config.data.seed,
            &config.data.windows,
        )
        .unwrap();
        LoadedData::new(ds, DataSourceKind::Synthetic)
    }

    fn grid() -> ParamGrid {
        ParamGrid {
            leverage_limits: vec![0.25, 0.5],
            top_ns: vec![2, 4],
            weightings: vec![WeightingScheme::Rank, WeightingScheme::Uniform],
            cost_models: vec![],
        }
    }

    #[test]
    fn test_param_grid_size() {
        // 2 leverage × 2 top_n × 2 weighting × 1 (base cost model) = 8
        assert_eq!(grid().size(), 8);
        assert_eq!(grid().generate_configs(&base_config()).len(), 8);
        assert_eq!(ParamGrid::default().size(), 1);
    }

    #[test]
    fn test_generated_configs_have_distinct_run_ids() {
        let configs = grid().generate_configs(&base_config());
        let mut ids: Vec<_> = configs.iter().map(|c| c.run_id().unwrap()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let base = base_config();
        let data = loaded(&base);
        let par = ParamSweep::new().sweep(&grid(), &base, &data).unwrap();
        let seq = ParamSweep::new()
            .with_parallelism(false)
            .sweep(&grid(), &base, &data)
            .unwrap();
        assert_eq!(par.len(), 8);
        assert_eq!(par.all(), seq.all());
    }

    #[test]
    fn test_best_has_highest_sharpe() {
        let base = base_config();
        let data = loaded(&base);
        let results = ParamSweep::new().sweep(&grid(), &base, &data).unwrap();
        let best = results.best().unwrap();
        assert!(results
            .all()
            .iter()
            .all(|r| r.metrics.sharpe <= best.metrics.sharpe));
        assert_eq!(results.get(&best.run_id), Some(best));
        assert_eq!(results.top_n(3).len(), 3);
    }

    #[test]
    fn test_invalid_point_rejected_before_running() {
        let base = base_config();
        let data = loaded(&base);
        let bad = ParamGrid {
            leverage_limits: vec![-1.0],
            ..ParamGrid::default()
        };
        assert!(matches!(
            ParamSweep::new().sweep(&bad, &base, &data),
            Err(RunError::Config(_))
        ));
    }
}
