//! CLI wiring tests: INI files on disk, store and source selection, and the
//! CSV source driven end to end through the resolver.

mod common;

use common::*;
use quotecache::adapters::file_config_adapter::FileConfigAdapter;
use quotecache::cli::{self, Services};
use quotecache::domain::error::QuoteCacheError;
use quotecache::ports::clock_port::Clock;
use rust_decimal_macros::dec;
use std::fs;
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn quotes_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("AAPL.csv"),
        "date,open,high,low,close,volume\n\
         2019-02-19,42.4275,42.86,42.3725,42.6050,75891346\n\
         2019-02-20,42.4275,43.33,42.3725,43.0075,104457448\n",
    )
    .unwrap();
    dir
}

fn csv_ini(dir: &TempDir, store: &str) -> String {
    format!(
        "[store]\nbackend = {store}\n\n[quotes]\nsource = csv\ncsv_dir = {}\n",
        dir.path().display()
    )
}

fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(date(2019, 2, 21)))
}

#[test]
fn load_config_reads_ini_from_disk() {
    let file = write_temp_ini("[store]\nbackend = memory\n");
    let config = cli::load_config(file.path()).unwrap();
    assert!(cli::build_store(&config).is_ok());
}

#[test]
fn unknown_backend_is_config_invalid() {
    let config = FileConfigAdapter::from_string("[store]\nbackend = redis\n").unwrap();
    match cli::build_store(&config) {
        Err(QuoteCacheError::ConfigInvalid { section, key, .. }) => {
            assert_eq!(section, "store");
            assert_eq!(key, "backend");
        }
        Err(other) => panic!("expected ConfigInvalid, got: {other}"),
        Ok(_) => panic!("expected error, got Ok"),
    }
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_backend_requires_path() {
    let config = FileConfigAdapter::from_string("[store]\nbackend = sqlite\n").unwrap();
    assert!(matches!(
        cli::build_store(&config),
        Err(QuoteCacheError::ConfigMissing { .. })
    ));
}

#[test]
fn unknown_source_is_config_invalid() {
    let config = FileConfigAdapter::from_string("[quotes]\nsource = bloomberg\n").unwrap();
    assert!(matches!(
        cli::build_quote_source(&config, clock()),
        Err(QuoteCacheError::ConfigInvalid { .. })
    ));
}

#[test]
fn iex_source_requires_token() {
    let config = FileConfigAdapter::from_string("[quotes]\nsource = iex\n").unwrap();
    match cli::build_quote_source(&config, clock()) {
        Err(QuoteCacheError::ConfigMissing { section, key }) => {
            assert_eq!(section, "quotes");
            assert_eq!(key, "token");
        }
        Err(other) => panic!("expected ConfigMissing, got: {other}"),
        Ok(_) => panic!("expected error, got Ok"),
    }
}

#[test]
fn iex_source_rejects_non_positive_timeout() {
    let config = FileConfigAdapter::from_string(
        "[quotes]\nsource = iex\ntoken = abc\ntimeout_secs = 0\n",
    )
    .unwrap();
    assert!(matches!(
        cli::build_quote_source(&config, clock()),
        Err(QuoteCacheError::ConfigInvalid { .. })
    ));
}

#[test]
fn csv_source_requires_dir() {
    let config = FileConfigAdapter::from_string("[quotes]\nsource = csv\n").unwrap();
    assert!(matches!(
        cli::build_quote_source(&config, clock()),
        Err(QuoteCacheError::ConfigMissing { .. })
    ));
}

#[test]
fn csv_source_through_memory_store() {
    let dir = quotes_dir();
    let config = FileConfigAdapter::from_string(&csv_ini(&dir, "memory")).unwrap();
    let clock = clock();
    let services = Services {
        store: cli::build_store(&config).unwrap(),
        quotes: cli::build_quote_source(&config, clock.clone()).unwrap(),
        clock,
    };
    let resolver = services.resolver();

    let prices = resolver.resolve("AAPL", None, Some("20190220")).unwrap();
    assert_eq!(prices, vec![aapl_20190220()]);
    assert_eq!(
        cli::format_price_line(&prices[0]),
        "AAPL,2019-02-20,42.4275,43.33,42.3725,43.0075,104457448"
    );

    let window = resolver.resolve("AAPL", Some("5d"), None).unwrap();
    let closes: Vec<_> = window.iter().map(|p| p.close).collect();
    assert_eq!(closes, vec![dec!(42.6050), dec!(43.0075)]);

    assert_eq!(resolver.cached_prices(Some("AAPL")).unwrap().len(), 2);
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_store_survives_reopening() {
    let dir = quotes_dir();
    let db = TempDir::new().unwrap();
    let ini = format!(
        "{}\n[sqlite]\npath = {}\n",
        csv_ini(&dir, "sqlite"),
        db.path().join("quotes.db").display()
    );
    let file = write_temp_ini(&ini);

    let build = || {
        let config = cli::load_config(file.path()).unwrap();
        let clock = clock();
        Services {
            store: cli::build_store(&config).unwrap(),
            quotes: cli::build_quote_source(&config, clock.clone()).unwrap(),
            clock,
        }
    };

    let first = build();
    let written = first.resolver().warm_range("AAPL", "5d").unwrap();
    assert_eq!(written, 2);
    drop(first);

    // Remove the source data: answers must now come from the database.
    fs::remove_file(dir.path().join("AAPL.csv")).unwrap();
    let second = build();
    let prices = second.resolver().resolve("AAPL", None, Some("20190220")).unwrap();
    assert_eq!(prices, vec![aapl_20190220()]);
}

#[test]
fn csv_source_lists_symbols_and_last_prices() {
    let dir = quotes_dir();
    fs::write(dir.path().join("MSFT.csv"), "date,open,high,low,close,volume\n").unwrap();
    let config = FileConfigAdapter::from_string(&csv_ini(&dir, "memory")).unwrap();
    let clock = clock();
    let services = Services {
        store: cli::build_store(&config).unwrap(),
        quotes: cli::build_quote_source(&config, clock.clone()).unwrap(),
        clock,
    };

    let symbols: Vec<String> = services
        .resolver()
        .list_symbols()
        .unwrap()
        .into_iter()
        .map(|s| s.symbol)
        .collect();
    assert_eq!(symbols, vec!["AAPL", "MSFT"]);

    let last = services
        .resolver()
        .last_traded_prices(&["AAPL".to_string()])
        .unwrap();
    assert_eq!(last[0].price, dec!(43.0075));
}
