//! Daily price records and the pass-through market reference types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One trading day's summary for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

/// A [`PricePoint`] as persisted by a store.
///
/// Several records may exist for the same `(symbol, date)`; readers pick the
/// one with the greatest `written_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredRecord {
    pub id: i64,
    pub written_at: DateTime<Utc>,
    pub price: PricePoint,
}

impl StoredRecord {
    pub fn key(&self) -> (&str, NaiveDate) {
        (&self.price.symbol, self.price.date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastTradedPrice {
    pub symbol: String,
    pub price: Decimal,
    #[serde(default)]
    pub size: u64,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub time: i64,
}

/// Write timestamp for the next insert: `now` truncated to microseconds,
/// unless that would not be strictly after `latest`.
pub fn next_write_timestamp(
    now: DateTime<Utc>,
    latest: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    let now = DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now);
    match latest {
        Some(latest) if now <= latest => latest + chrono::Duration::microseconds(1),
        _ => now,
    }
}
