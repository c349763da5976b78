//! Dataset loading for the runner.
//!
//! Three sources feed the same [`PriceDatasetBuilder`]:
//! - long-format CSV (`date,symbol,close,volume[,pct_chg][,volatility][,score]`)
//! - Parquet with the same columns, read through polars
//! - a seeded random walk, for development and tests
//!
//! Columns a source does not carry are derived per symbol from closes. Results
//! produced on synthetic data are tagged as such.

use chrono::{Datelike, NaiveDate};
use folio_core::data::{DataError, FeatureWindows, Observation, PriceDataset, PriceDatasetBuilder};
use folio_core::domain::{PositionSchedule, Symbol, Weights};
use polars::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{DataSection, DataSourceKind};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("parquet error in {path}: {reason}")]
    Parquet { path: PathBuf, reason: String },

    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("null {column} at row {row} of {path}")]
    NullValue {
        path: PathBuf,
        column: String,
        row: usize,
    },

    #[error("schedule lists {symbol} twice on {date}")]
    DuplicateScheduleEntry { symbol: String, date: NaiveDate },

    #[error("source '{0}' needs a path")]
    MissingPath(&'static str),

    #[error("no records loaded")]
    Empty,

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// A built dataset plus the provenance the result artifact records.
#[derive(Debug)]
pub struct LoadedData {
    pub dataset: PriceDataset,
    /// BLAKE3 over every record, in symbol then date order.
    pub dataset_hash: String,
    pub source: DataSourceKind,
    pub has_synthetic: bool,
}

impl LoadedData {
    pub fn new(dataset: PriceDataset, source: DataSourceKind) -> Self {
        let dataset_hash = compute_dataset_hash(&dataset);
        Self {
            dataset,
            dataset_hash,
            source,
            has_synthetic: source == DataSourceKind::Synthetic,
        }
    }
}

/// Load whatever the `[data]` section points at.
///
/// File sources are read in full so derived features have their history. The
/// synthetic calendar starts early enough to fill both feature windows before
/// `start`.
pub fn load_dataset(
    data: &DataSection,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<LoadedData, LoadError> {
    let dataset = match data.source {
        DataSourceKind::Csv => {
            let path = data.path.as_deref().ok_or(LoadError::MissingPath("csv"))?;
            load_csv(path, &data.windows)?
        }
        DataSourceKind::Parquet => {
            let path = data
                .path
                .as_deref()
                .ok_or(LoadError::MissingPath("parquet"))?;
            load_parquet(path, &data.windows)?
        }
        DataSourceKind::Synthetic => {
            warn!(
                symbols = data.symbols.len(),
                seed = data.seed,
                "generating synthetic data; results will be tagged as synthetic"
            );
            let from = synthetic_warmup_start(start, &data.windows);
            generate_synthetic(&data.symbols, from, end, data.seed, &data.windows)?
        }
    };

    if dataset.is_empty() {
        return Err(LoadError::Empty);
    }

    let loaded = LoadedData::new(dataset, data.source);
    info!(
        source = data.source.as_str(),
        symbols = loaded.dataset.symbol_count(),
        dates = loaded.dataset.date_count(),
        records = loaded.dataset.record_count(),
        hash = %&loaded.dataset_hash[..12],
        "dataset loaded"
    );
    Ok(loaded)
}

// ── CSV ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: NaiveDate,
    symbol: String,
    close: f64,
    volume: f64,
    #[serde(default)]
    pct_chg: Option<f64>,
    #[serde(default)]
    volatility: Option<f64>,
    #[serde(default)]
    score: Option<f64>,
}

impl From<PriceRow> for Observation {
    fn from(row: PriceRow) -> Self {
        Observation {
            date: row.date,
            close: row.close,
            volume: row.volume,
            pct_chg: row.pct_chg,
            volatility: row.volatility,
            score: row.score,
        }
    }
}

/// Load a long-format price CSV from disk.
pub fn load_csv(path: &Path, windows: &FeatureWindows) -> Result<PriceDataset, LoadError> {
    let file = fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_price_csv(file, windows)
}

/// Parse a long-format price CSV from any reader.
pub fn read_price_csv<R: Read>(
    reader: R,
    windows: &FeatureWindows,
) -> Result<PriceDataset, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut by_symbol: BTreeMap<Symbol, Vec<Observation>> = BTreeMap::new();
    for row in rdr.deserialize::<PriceRow>() {
        let row = row?;
        by_symbol
            .entry(row.symbol.clone())
            .or_default()
            .push(row.into());
    }
    build_dataset(by_symbol, windows)
}

fn build_dataset(
    by_symbol: BTreeMap<Symbol, Vec<Observation>>,
    windows: &FeatureWindows,
) -> Result<PriceDataset, LoadError> {
    let mut builder = PriceDatasetBuilder::new();
    for (symbol, observations) in by_symbol {
        let derived = observations
            .iter()
            .filter(|o| o.volatility.is_none() || o.score.is_none())
            .count();
        if derived > 0 && observations.len() < windows.volatility {
            warn!(
                %symbol,
                rows = observations.len(),
                window = windows.volatility,
                "history shorter than the volatility window; derived volatility stays NaN"
            );
        }
        builder.push_observations(&symbol, observations, windows)?;
    }
    Ok(builder.build())
}

// ── Parquet ──────────────────────────────────────────────────────────

/// Load a Parquet file with the CSV column layout.
///
/// `date` may be a Date column or an ISO `YYYY-MM-DD` string column. Numeric
/// columns are cast to f64.
pub fn load_parquet(path: &Path, windows: &FeatureWindows) -> Result<PriceDataset, LoadError> {
    let file = fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parquet_err = |e: PolarsError| LoadError::Parquet {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let df = ParquetReader::new(file).finish().map_err(parquet_err)?;

    for column in ["date", "symbol", "close", "volume"] {
        if df.column(column).is_err() {
            return Err(LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let dates = read_dates(&df, path)?;
    let symbols = df
        .column("symbol")
        .map_err(parquet_err)?
        .str()
        .map_err(parquet_err)?
        .clone();
    let close = float_column(&df, "close", path)?.ok_or_else(|| missing(path, "close"))?;
    let volume = float_column(&df, "volume", path)?.ok_or_else(|| missing(path, "volume"))?;
    let pct_chg = float_column(&df, "pct_chg", path)?;
    let volatility = float_column(&df, "volatility", path)?;
    let score = float_column(&df, "score", path)?;

    let null = |column: &str, row: usize| LoadError::NullValue {
        path: path.to_path_buf(),
        column: column.to_string(),
        row,
    };

    let mut by_symbol: BTreeMap<Symbol, Vec<Observation>> = BTreeMap::new();
    for (i, date) in dates.into_iter().enumerate() {
        let symbol = symbols.get(i).ok_or_else(|| null("symbol", i))?;
        let observation = Observation {
            date,
            close: close.get(i).ok_or_else(|| null("close", i))?,
            volume: volume.get(i).ok_or_else(|| null("volume", i))?,
            pct_chg: pct_chg.as_ref().and_then(|c| c.get(i)),
            volatility: volatility.as_ref().and_then(|c| c.get(i)),
            score: score.as_ref().and_then(|c| c.get(i)),
        };
        by_symbol
            .entry(symbol.to_string())
            .or_default()
            .push(observation);
    }
    build_dataset(by_symbol, windows)
}

fn missing(path: &Path, column: &str) -> LoadError {
    LoadError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    }
}

fn float_column(
    df: &DataFrame,
    name: &str,
    path: &Path,
) -> Result<Option<Float64Chunked>, LoadError> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let parquet_err = |e: PolarsError| LoadError::Parquet {
        path: path.to_path_buf(),
        reason: format!("{name} column: {e}"),
    };
    let cast = column.cast(&DataType::Float64).map_err(parquet_err)?;
    Ok(Some(cast.f64().map_err(parquet_err)?.clone()))
}

fn read_dates(df: &DataFrame, path: &Path) -> Result<Vec<NaiveDate>, LoadError> {
    let parquet_err = |e: PolarsError| LoadError::Parquet {
        path: path.to_path_buf(),
        reason: format!("date column: {e}"),
    };
    let null = |row: usize| LoadError::NullValue {
        path: path.to_path_buf(),
        column: "date".to_string(),
        row,
    };
    let column = df.column("date").map_err(parquet_err)?;
    let epoch = unix_epoch();

    if let DataType::String = column.dtype() {
        let ca = column.str().map_err(parquet_err)?;
        return (0..df.height())
            .map(|i| {
                let raw = ca.get(i).ok_or_else(|| null(i))?;
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| LoadError::Parquet {
                    path: path.to_path_buf(),
                    reason: format!("date '{raw}' at row {i}: {e}"),
                })
            })
            .collect();
    }

    let ca = column.date().map_err(parquet_err)?;
    (0..df.height())
        .map(|i| {
            let days = ca.get(i).ok_or_else(|| null(i))?;
            Ok(epoch + chrono::Duration::days(days as i64))
        })
        .collect()
}

fn unix_epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Write a dataset to Parquet in the layout [`load_parquet`] reads back.
pub fn write_parquet(dataset: &PriceDataset, path: &Path) -> Result<(), LoadError> {
    let parquet_err = |e: PolarsError| LoadError::Parquet {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let epoch = unix_epoch();

    let mut dates: Vec<i32> = Vec::new();
    let mut symbols: Vec<String> = Vec::new();
    let mut closes = Vec::new();
    let mut volumes = Vec::new();
    let mut pct_chg = Vec::new();
    let mut volatility = Vec::new();
    let mut score = Vec::new();
    for symbol in dataset.symbols() {
        for (date, record) in dataset.history(symbol) {
            dates.push((date - epoch).num_days() as i32);
            symbols.push(symbol.clone());
            closes.push(record.close);
            volumes.push(record.volume);
            pct_chg.push(record.pct_chg);
            volatility.push(record.volatility);
            score.push(record.score);
        }
    }

    let mut df = DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(parquet_err)?,
        Column::new("symbol".into(), symbols),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
        Column::new("pct_chg".into(), pct_chg),
        Column::new("volatility".into(), volatility),
        Column::new("score".into(), score),
    ])
    .map_err(parquet_err)?;

    let file = fs::File::create(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ParquetWriter::new(file).finish(&mut df).map_err(parquet_err)?;
    Ok(())
}

// ── Synthetic ────────────────────────────────────────────────────────

/// Seeded random walk per symbol, weekdays only, starting at 100.0.
///
/// The same (seed, symbol, range) always yields the same dataset.
pub fn generate_synthetic(
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    seed: u64,
    windows: &FeatureWindows,
) -> Result<PriceDataset, LoadError> {
    let by_symbol = symbols
        .iter()
        .map(|s| (s.clone(), synthetic_observations(s, start, end, seed)))
        .collect();
    build_dataset(by_symbol, windows)
}

/// First synthetic date such that every weekday from `start` on has both
/// rolling volatility and score defined.
pub fn synthetic_warmup_start(start: NaiveDate, windows: &FeatureWindows) -> NaiveDate {
    // Score windows run over returns, which lag closes by one.
    let mut remaining = windows.volatility.max(windows.score + 1);
    let mut current = start;
    while remaining > 0 {
        current -= chrono::Duration::days(1);
        if !matches!(current.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun) {
            remaining -= 1;
        }
    }
    current
}

fn synthetic_observations(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    seed: u64,
) -> Vec<Observation> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(symbol.as_bytes());
    let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

    // Per-symbol drift and volatility so rankings are not all alike.
    let drift: f64 = rng.gen_range(-0.0005..0.001);
    let sigma: f64 = rng.gen_range(0.005..0.03);

    let mut observations = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;
    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return = drift + rng.gen_range(-sigma..sigma);
        price *= 1.0 + daily_return;
        let volume = rng.gen_range(500_000..5_000_000u64) as f64;
        observations.push(Observation::new(current, price, volume));

        current += chrono::Duration::days(1);
    }
    observations
}

// ── Schedules ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ScheduleRow {
    date: NaiveDate,
    symbol: String,
    weight: f64,
}

/// Load a precomputed `date,symbol,weight` schedule from disk.
pub fn load_schedule_csv(path: &Path) -> Result<PositionSchedule, LoadError> {
    let file = fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_schedule_csv(file)
}

pub fn read_schedule_csv<R: Read>(reader: R) -> Result<PositionSchedule, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut entries: BTreeMap<NaiveDate, Weights> = BTreeMap::new();
    for row in rdr.deserialize::<ScheduleRow>() {
        let row = row?;
        let day = entries.entry(row.date).or_default();
        if day.insert(row.symbol.clone(), row.weight).is_some() {
            return Err(LoadError::DuplicateScheduleEntry {
                symbol: row.symbol,
                date: row.date,
            });
        }
    }
    Ok(entries.into_iter().collect())
}

// ── Hashing ──────────────────────────────────────────────────────────

/// Compute a deterministic BLAKE3 hash over every record.
///
/// Symbols and dates are visited in sorted order, so the hash does not depend
/// on the order rows were loaded in.
pub fn compute_dataset_hash(dataset: &PriceDataset) -> String {
    let mut hasher = blake3::Hasher::new();
    for symbol in dataset.symbols() {
        hasher.update(symbol.as_bytes());
        for (date, record) in dataset.history(symbol) {
            hasher.update(date.to_string().as_bytes());
            hasher.update(&record.close.to_le_bytes());
            hasher.update(&record.pct_chg.to_le_bytes());
            hasher.update(&record.volume.to_le_bytes());
            hasher.update(&record.volatility.to_le_bytes());
            hasher.update(&record.score.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
