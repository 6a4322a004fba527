//! Offline quote source backed by one CSV file per symbol.
//!
//! `<base_path>/<SYMBOL>.csv` with header `date,open,high,low,close,volume`
//! and `YYYY-MM-DD` dates. A symbol without a file simply has no data.

use crate::domain::date_span::parse_range;
use crate::domain::error::QuoteCacheError;
use crate::domain::price::{LastTradedPrice, PricePoint, SymbolInfo};
use crate::ports::clock_port::Clock;
use crate::ports::quote_port::QuotePort;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

const SOURCE_NAME: &str = "csv";

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: u64,
}

pub struct CsvAdapter {
    base_path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf, clock: Arc<dyn Clock>) -> Self {
        Self { base_path, clock }
    }

    fn csv_path(&self, symbol: &str) -> Result<PathBuf, QuoteCacheError> {
        if symbol.is_empty() || symbol.contains(['/', '\\']) || symbol.contains("..") {
            return Err(QuoteCacheError::remote(
                SOURCE_NAME,
                format!("invalid symbol {symbol:?}"),
            ));
        }
        Ok(self.base_path.join(format!("{symbol}.csv")))
    }

    /// All rows for `symbol`, oldest first.
    fn read(&self, symbol: &str) -> Result<Vec<PricePoint>, QuoteCacheError> {
        let path = self.csv_path(symbol)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(QuoteCacheError::remote(
                    SOURCE_NAME,
                    format!("failed to read {}: {}", path.display(), e),
                ));
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut prices = Vec::new();
        for result in rdr.deserialize::<CsvRow>() {
            let row = result.map_err(|e| {
                QuoteCacheError::remote(
                    SOURCE_NAME,
                    format!("{}: CSV parse error: {}", path.display(), e),
                )
            })?;
            prices.push(PricePoint {
                symbol: symbol.to_string(),
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        prices.sort_by_key(|p| p.date);
        Ok(prices)
    }

    fn on_date(&self, symbol: &str, date: NaiveDate) -> Result<Vec<PricePoint>, QuoteCacheError> {
        Ok(self
            .read(symbol)?
            .into_iter()
            .filter(|p| p.date == date)
            .collect())
    }
}

impl QuotePort for CsvAdapter {
    fn fetch_by_date(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Vec<PricePoint>, QuoteCacheError> {
        self.on_date(symbol, date)
    }

    fn fetch_by_range(
        &self,
        symbol: &str,
        range: &str,
    ) -> Result<Vec<PricePoint>, QuoteCacheError> {
        let span = parse_range(range, self.clock.today())?;
        Ok(self
            .read(symbol)?
            .into_iter()
            .filter(|p| span.contains(p.date))
            .collect())
    }

    fn fetch_by_date_and_range(
        &self,
        symbol: &str,
        _range: &str,
        date: NaiveDate,
    ) -> Result<Vec<PricePoint>, QuoteCacheError> {
        self.on_date(symbol, date)
    }

    fn list_symbols(&self) -> Result<Vec<SymbolInfo>, QuoteCacheError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            QuoteCacheError::remote(
                SOURCE_NAME,
                format!(
                    "failed to read directory {}: {}",
                    self.base_path.display(),
                    e
                ),
            )
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                QuoteCacheError::remote(SOURCE_NAME, format!("directory entry error: {}", e))
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(SymbolInfo {
                    symbol: symbol.to_string(),
                    name: None,
                    exchange: None,
                });
            }
        }

        symbols.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(symbols)
    }

    fn last_traded_prices(
        &self,
        symbols: &[String],
    ) -> Result<Vec<LastTradedPrice>, QuoteCacheError> {
        let mut prices = Vec::new();
        for symbol in symbols {
            if let Some(last) = self.read(symbol)?.pop() {
                prices.push(LastTradedPrice {
                    symbol: last.symbol,
                    price: last.close,
                    size: last.volume,
                    time: last.date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_millis(),
                });
            }
        }
        Ok(prices)
    }
}
