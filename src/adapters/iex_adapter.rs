//! IEX Cloud compatible quote source.
//!
//! Endpoints used:
//! - `/stock/{symbol}/chart/date/{yyyymmdd}?chartByDay=true`
//! - `/stock/{symbol}/chart/{range}`
//! - `/stock/{symbol}/chart/{range}/{yyyymmdd}?chartByDay=true`
//! - `/ref-data/symbols`
//! - `/tops/last?symbols=A,B`
//!
//! Every request carries the `token` query parameter.

use crate::domain::date_span::format_query_date;
use crate::domain::error::QuoteCacheError;
use crate::domain::price::{LastTradedPrice, PricePoint, SymbolInfo};
use crate::ports::config_port::ConfigPort;
use crate::ports::quote_port::QuotePort;
use chrono::NaiveDate;
use reqwest::Url;
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const SOURCE_NAME: &str = "iex";
pub const DEFAULT_BASE_URL: &str = "https://cloud.iexapis.com/stable";
const DEFAULT_TIMEOUT_SECS: i64 = 30;

/// One element of a chart response.
#[derive(Debug, Deserialize)]
struct ChartRecord {
    #[serde(default)]
    symbol: Option<String>,
    date: NaiveDate,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    open: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    high: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    low: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    close: Decimal,
    #[serde(default)]
    volume: Option<u64>,
}

impl ChartRecord {
    fn into_price(self, requested: &str) -> PricePoint {
        PricePoint {
            symbol: self.symbol.unwrap_or_else(|| requested.to_string()),
            date: self.date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume.unwrap_or(0),
        }
    }
}

/// One element of a `tops/last` response.
#[derive(Debug, Deserialize)]
struct LastRecord {
    symbol: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    price: Decimal,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    time: i64,
}

impl From<LastRecord> for LastTradedPrice {
    fn from(record: LastRecord) -> Self {
        Self {
            symbol: record.symbol,
            price: record.price,
            size: record.size,
            time: record.time,
        }
    }
}

pub struct IexAdapter {
    client: Client,
    base_url: Url,
    token: String,
}

impl IexAdapter {
    pub fn new(base_url: &str, token: String, timeout: Duration) -> Result<Self, QuoteCacheError> {
        // Url::join drops the last path segment unless it ends with '/'.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|e| QuoteCacheError::ConfigInvalid {
            section: "quotes".into(),
            key: "base_url".into(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuoteCacheError::remote(SOURCE_NAME, e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuoteCacheError> {
        let token =
            config
                .get_string("quotes", "token")
                .ok_or_else(|| QuoteCacheError::ConfigMissing {
                    section: "quotes".into(),
                    key: "token".into(),
                })?;
        let base_url = config
            .get_string("quotes", "base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout_secs = config.get_int("quotes", "timeout_secs", DEFAULT_TIMEOUT_SECS);
        if timeout_secs <= 0 {
            return Err(QuoteCacheError::ConfigInvalid {
                section: "quotes".into(),
                key: "timeout_secs".into(),
                reason: "must be positive".into(),
            });
        }

        Self::new(&base_url, token, Duration::from_secs(timeout_secs as u64))
    }

    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, QuoteCacheError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| QuoteCacheError::remote(SOURCE_NAME, "base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut()
            .extend_pairs(query)
            .append_pair("token", &self.token);
        Ok(url)
    }

    fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, QuoteCacheError> {
        debug!(url = %url.as_str().replace(&self.token, "***"), "iex request");

        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                QuoteCacheError::remote(SOURCE_NAME, "request timed out")
            } else {
                QuoteCacheError::remote(SOURCE_NAME, e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuoteCacheError::remote(SOURCE_NAME, format!("HTTP {status}")));
        }

        let body = response
            .text()
            .map_err(|e| QuoteCacheError::remote(SOURCE_NAME, e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| QuoteCacheError::remote(SOURCE_NAME, format!("malformed payload: {e}")))
    }

    fn chart(&self, symbol: &str, url: Url) -> Result<Vec<PricePoint>, QuoteCacheError> {
        let records: Vec<ChartRecord> = self.get(url)?;
        Ok(records.into_iter().map(|r| r.into_price(symbol)).collect())
    }
}

impl QuotePort for IexAdapter {
    fn fetch_by_date(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Vec<PricePoint>, QuoteCacheError> {
        let date = format_query_date(date);
        let url = self.url(
            &["stock", symbol, "chart", "date", &date],
            &[("chartByDay", "true")],
        )?;
        self.chart(symbol, url)
    }

    fn fetch_by_range(
        &self,
        symbol: &str,
        range: &str,
    ) -> Result<Vec<PricePoint>, QuoteCacheError> {
        let url = self.url(&["stock", symbol, "chart", range], &[])?;
        self.chart(symbol, url)
    }

    fn fetch_by_date_and_range(
        &self,
        symbol: &str,
        range: &str,
        date: NaiveDate,
    ) -> Result<Vec<PricePoint>, QuoteCacheError> {
        let date = format_query_date(date);
        let url = self.url(
            &["stock", symbol, "chart", range, &date],
            &[("chartByDay", "true")],
        )?;
        self.chart(symbol, url)
    }

    fn list_symbols(&self) -> Result<Vec<SymbolInfo>, QuoteCacheError> {
        let url = self.url(&["ref-data", "symbols"], &[])?;
        self.get(url)
    }

    fn last_traded_prices(
        &self,
        symbols: &[String],
    ) -> Result<Vec<LastTradedPrice>, QuoteCacheError> {
        let joined = symbols.join(",");
        let url = self.url(&["tops", "last"], &[("symbols", &joined)])?;
        let records: Vec<LastRecord> = self.get(url)?;
        Ok(records.into_iter().map(LastTradedPrice::from).collect())
    }
}
