//! Artifact export — JSON result, value series, ledger, sweep table, datasets.
//!
//! All persisted JSON carries a `schema_version` field. Newer versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use folio_core::data::PriceDataset;
use folio_core::domain::ValuePoint;
use folio_core::engine::DailyLedger;

use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::sweep::SweepResults;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the portfolio value series as `date,cash`.
pub fn export_series_csv(series: &[ValuePoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "cash"])?;
    for p in series {
        wtr.write_record([p.date.to_string(), format!("{:.2}", p.cash)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the per-date ledger.
pub fn export_ledger_csv(ledger: &[DailyLedger]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "returns",
        "transaction_cost",
        "holding_fee",
        "turnover",
        "cash",
    ])?;
    for l in ledger {
        wtr.write_record([
            l.date.to_string(),
            format!("{:.2}", l.returns),
            format!("{:.2}", l.transaction_cost),
            format!("{:.2}", l.holding_fee),
            format!("{:.6}", l.turnover),
            format!("{:.2}", l.cash),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per sweep point, best Sharpe first.
pub fn export_sweep_csv(results: &SweepResults) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "run_id",
        "weighting",
        "top_n",
        "leverage_limit",
        "cost_model",
        "sharpe",
        "cagr",
        "max_drawdown",
        "total_return",
        "final_cash",
    ])?;
    for r in results.sorted_by_sharpe() {
        wtr.write_record([
            r.run_id.clone(),
            r.strategy.weighting.clone(),
            r.strategy.top_n.map(|n| n.to_string()).unwrap_or_default(),
            format!("{}", r.strategy.leverage_limit),
            r.cost_model.clone(),
            format!("{:.4}", r.metrics.sharpe),
            format!("{:.4}", r.metrics.cagr),
            format!("{:.4}", r.metrics.max_drawdown),
            format!("{:.4}", r.metrics.total_return),
            format!("{:.2}", r.final_cash),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export a dataset in the long CSV layout the loader reads.
pub fn export_dataset_csv(dataset: &PriceDataset) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "symbol",
        "close",
        "volume",
        "pct_chg",
        "volatility",
        "score",
    ])?;
    for symbol in dataset.symbols() {
        for (date, r) in dataset.history(symbol) {
            wtr.write_record([
                date.to_string(),
                symbol.clone(),
                r.close.to_string(),
                r.volume.to_string(),
                optional(r.pct_chg),
                optional(r.volatility),
                optional(r.score),
            ])?;
        }
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// NaN is written as an empty cell so it reads back as "absent".
fn optional(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates `{run_id prefix}/` under `output_dir` containing `result.json`,
/// `series.csv` and `ledger.csv`. Returns the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let prefix = result.run_id.get(..12).unwrap_or(&result.run_id);
    let run_dir = output_dir.join(prefix);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("result.json"), export_json(result)?)?;
    std::fs::write(run_dir.join("series.csv"), export_series_csv(&result.series)?)?;
    std::fs::write(run_dir.join("ledger.csv"), export_ledger_csv(&result.ledger)?)?;

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's result.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
