//! Remote quote source port trait.

use crate::domain::error::QuoteCacheError;
use crate::domain::price::{LastTradedPrice, PricePoint, SymbolInfo};
use chrono::NaiveDate;

pub trait QuotePort: Send + Sync {
    fn fetch_by_date(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Vec<PricePoint>, QuoteCacheError>;

    fn fetch_by_range(&self, symbol: &str, range: &str)
    -> Result<Vec<PricePoint>, QuoteCacheError>;

    fn fetch_by_date_and_range(
        &self,
        symbol: &str,
        range: &str,
        date: NaiveDate,
    ) -> Result<Vec<PricePoint>, QuoteCacheError>;

    fn list_symbols(&self) -> Result<Vec<SymbolInfo>, QuoteCacheError>;

    fn last_traded_prices(
        &self,
        symbols: &[String],
    ) -> Result<Vec<LastTradedPrice>, QuoteCacheError>;
}
