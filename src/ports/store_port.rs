//! Price store port trait.

use crate::domain::error::QuoteCacheError;
use crate::domain::price::{PricePoint, StoredRecord};
use chrono::NaiveDate;

/// Append-only record store keyed by `(symbol, date)`.
///
/// Implementations never enforce uniqueness: inserting the same key twice
/// yields two records, and readers reconcile them.
pub trait PriceStore: Send + Sync {
    /// Persist `price`, assigning an id and a write timestamp strictly later
    /// than any the store has handed out before.
    fn insert(&self, price: &PricePoint) -> Result<StoredRecord, QuoteCacheError>;

    fn query_by_date(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Vec<StoredRecord>, QuoteCacheError>;

    fn query_all(&self) -> Result<Vec<StoredRecord>, QuoteCacheError>;
}
