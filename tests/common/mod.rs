#![allow(dead_code)]

use chrono::NaiveDate;
use quotecache::domain::error::QuoteCacheError;
use quotecache::adapters::memory_store::MemoryStore;
use quotecache::domain::price::{LastTradedPrice, PricePoint, StoredRecord, SymbolInfo};
use quotecache::ports::clock_port::Clock;
use quotecache::ports::quote_port::QuotePort;
use quotecache::ports::store_port::PriceStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Mutex;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub fn make_price(symbol: &str, on: NaiveDate, close: Decimal) -> PricePoint {
    PricePoint {
        symbol: symbol.to_string(),
        date: on,
        open: close - dec!(0.5),
        high: close + dec!(1),
        low: close - dec!(1),
        close,
        volume: 1_000,
    }
}

/// AAPL on 2019-02-20 as the IEX chart endpoint reports it.
pub fn aapl_20190220() -> PricePoint {
    PricePoint {
        symbol: "AAPL".into(),
        date: date(2019, 2, 20),
        open: dec!(42.4275),
        high: dec!(43.33),
        low: dec!(42.3725),
        close: dec!(43.0075),
        volume: 104_457_448,
    }
}

/// A remote source answering from canned data and logging every call.
#[derive(Default)]
pub struct RecordingQuotes {
    by_date: HashMap<(String, NaiveDate), Vec<PricePoint>>,
    by_range: HashMap<String, Vec<PricePoint>>,
    failing_dates: HashMap<NaiveDate, String>,
    symbols: Vec<SymbolInfo>,
    last: Vec<LastTradedPrice>,
    pub calls: Mutex<Vec<String>>,
}

impl RecordingQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prices(mut self, prices: Vec<PricePoint>) -> Self {
        for price in prices {
            self.by_date
                .entry((price.symbol.clone(), price.date))
                .or_default()
                .push(price.clone());
            self.by_range
                .entry(price.symbol.clone())
                .or_default()
                .push(price);
        }
        self
    }

    pub fn with_failure(mut self, on: NaiveDate, reason: &str) -> Self {
        self.failing_dates.insert(on, reason.to_string());
        self
    }

    pub fn with_symbols(mut self, symbols: &[&str]) -> Self {
        self.symbols = symbols
            .iter()
            .map(|s| SymbolInfo {
                symbol: s.to_string(),
                name: None,
                exchange: None,
            })
            .collect();
        self
    }

    pub fn with_last(mut self, last: Vec<LastTradedPrice>) -> Self {
        self.last = last;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn on_date(&self, symbol: &str, on: NaiveDate) -> Result<Vec<PricePoint>, QuoteCacheError> {
        if let Some(reason) = self.failing_dates.get(&on) {
            return Err(QuoteCacheError::remote("mock", reason.clone()));
        }
        Ok(self
            .by_date
            .get(&(symbol.to_string(), on))
            .cloned()
            .unwrap_or_default())
    }
}

impl QuotePort for RecordingQuotes {
    fn fetch_by_date(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Vec<PricePoint>, QuoteCacheError> {
        self.record(format!("date {symbol} {}", date.format("%Y%m%d")));
        self.on_date(symbol, date)
    }

    fn fetch_by_range(
        &self,
        symbol: &str,
        range: &str,
    ) -> Result<Vec<PricePoint>, QuoteCacheError> {
        self.record(format!("range {symbol} {range}"));
        Ok(self.by_range.get(symbol).cloned().unwrap_or_default())
    }

    fn fetch_by_date_and_range(
        &self,
        symbol: &str,
        range: &str,
        date: NaiveDate,
    ) -> Result<Vec<PricePoint>, QuoteCacheError> {
        self.record(format!("both {symbol} {range} {}", date.format("%Y%m%d")));
        self.on_date(symbol, date)
    }

    fn list_symbols(&self) -> Result<Vec<SymbolInfo>, QuoteCacheError> {
        self.record("symbols".into());
        Ok(self.symbols.clone())
    }

    fn last_traded_prices(
        &self,
        symbols: &[String],
    ) -> Result<Vec<LastTradedPrice>, QuoteCacheError> {
        self.record(format!("last {}", symbols.join(",")));
        Ok(self
            .last
            .iter()
            .filter(|l| symbols.contains(&l.symbol))
            .cloned()
            .collect())
    }
}

/// Number of records a store holds, duplicates included.
pub fn stored(store: &dyn PriceStore) -> usize {
    store.query_all().unwrap().len()
}

/// A memory store whose reads fail on chosen dates and whose inserts can be
/// made to fail. Every read is logged.
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    failing_reads: Vec<NaiveDate>,
    fail_inserts: bool,
    pub reads: Mutex<Vec<NaiveDate>>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_read_on(mut self, on: NaiveDate) -> Self {
        self.failing_reads.push(on);
        self
    }

    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    pub fn reads(&self) -> Vec<NaiveDate> {
        self.reads.lock().unwrap().clone()
    }
}

impl PriceStore for FailingStore {
    fn insert(&self, price: &PricePoint) -> Result<StoredRecord, QuoteCacheError> {
        if self.fail_inserts {
            return Err(QuoteCacheError::StoreQuery {
                reason: "disk I/O error".into(),
            });
        }
        self.inner.insert(price)
    }

    fn query_by_date(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Vec<StoredRecord>, QuoteCacheError> {
        self.reads.lock().unwrap().push(date);
        if self.failing_reads.contains(&date) {
            return Err(QuoteCacheError::Store {
                reason: "connection refused".into(),
            });
        }
        self.inner.query_by_date(symbol, date)
    }

    fn query_all(&self) -> Result<Vec<StoredRecord>, QuoteCacheError> {
        self.inner.query_all()
    }
}
