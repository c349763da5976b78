//! Data pipeline tests: file formats agree with each other and with the hash.

use chrono::NaiveDate;
use folio_core::data::FeatureWindows;
use folio_runner::data_loader::{
    compute_dataset_hash, generate_synthetic, load_csv, load_parquet, write_parquet,
};
use folio_runner::export::export_dataset_csv;
use folio_runner::{load_dataset, DataSection, DataSourceKind, LoadError};
use tempfile::TempDir;

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, m, day).unwrap()
}

fn universe() -> Vec<String> {
    vec!["ALPHA".into(), "BETA".into(), "GAMMA".into()]
}

#[test]
fn parquet_round_trip_preserves_records() {
    let tmp = TempDir::new().unwrap();
    let windows = FeatureWindows { volatility: 10, score: 5 };
    let ds = generate_synthetic(&universe(), d(1, 2), d(3, 31), 3, &windows).unwrap();

    let path = tmp.path().join("prices.parquet");
    write_parquet(&ds, &path).unwrap();
    let back = load_parquet(&path, &windows).unwrap();

    assert_eq!(back.record_count(), ds.record_count());
    assert_eq!(compute_dataset_hash(&back), compute_dataset_hash(&ds));
}

#[test]
fn csv_and_parquet_agree() {
    let tmp = TempDir::new().unwrap();
    let windows = FeatureWindows::default();
    let ds = generate_synthetic(&universe(), d(1, 2), d(2, 28), 9, &windows).unwrap();

    let csv_path = tmp.path().join("prices.csv");
    std::fs::write(&csv_path, export_dataset_csv(&ds).unwrap()).unwrap();
    let parquet_path = tmp.path().join("prices.parquet");
    write_parquet(&ds, &parquet_path).unwrap();

    let from_csv = load_csv(&csv_path, &windows).unwrap();
    let from_parquet = load_parquet(&parquet_path, &windows).unwrap();
    assert_eq!(from_csv.symbol_count(), from_parquet.symbol_count());
    assert_eq!(from_csv.date_count(), from_parquet.date_count());
    for symbol in from_csv.symbols() {
        for (date, a) in from_csv.history(symbol) {
            let b = from_parquet.record(symbol, date).unwrap();
            assert!((a.close - b.close).abs() < 1e-9);
            assert_eq!(a.volume, b.volume);
        }
    }
}

#[test]
fn synthetic_source_is_tagged() {
    let data = DataSection::synthetic(universe(), 5);
    let loaded = load_dataset(&data, d(1, 2), d(1, 31)).unwrap();
    assert!(loaded.has_synthetic);
    assert_eq!(loaded.source, DataSourceKind::Synthetic);
    assert_eq!(loaded.dataset.symbol_count(), 3);
}

#[test]
fn missing_file_is_io_error() {
    let tmp = TempDir::new().unwrap();
    let data = DataSection::csv(tmp.path().join("nope.csv"));
    assert!(matches!(
        load_dataset(&data, d(1, 2), d(1, 31)),
        Err(LoadError::Io { .. })
    ));
}
