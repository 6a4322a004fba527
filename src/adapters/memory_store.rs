//! In-process price store.

use crate::domain::error::QuoteCacheError;
use crate::domain::price::{PricePoint, StoredRecord, next_write_timestamp};
use crate::ports::store_port::PriceStore;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    next_id: i64,
    latest: Option<DateTime<Utc>>,
    records: Vec<StoredRecord>,
}

/// Keeps every insert in memory, in insertion order. Nothing survives the
/// process.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, QuoteCacheError> {
        self.inner.lock().map_err(|_| QuoteCacheError::Store {
            reason: "memory store lock poisoned".into(),
        })
    }
}

impl PriceStore for MemoryStore {
    fn insert(&self, price: &PricePoint) -> Result<StoredRecord, QuoteCacheError> {
        let mut inner = self.lock()?;
        let written_at = next_write_timestamp(Utc::now(), inner.latest);
        inner.next_id += 1;
        let record = StoredRecord {
            id: inner.next_id,
            written_at,
            price: price.clone(),
        };
        inner.latest = Some(written_at);
        inner.records.push(record.clone());
        Ok(record)
    }

    fn query_by_date(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Vec<StoredRecord>, QuoteCacheError> {
        let inner = self.lock()?;
        Ok(inner
            .records
            .iter()
            .filter(|r| r.price.symbol == symbol && r.price.date == date)
            .cloned()
            .collect())
    }

    fn query_all(&self) -> Result<Vec<StoredRecord>, QuoteCacheError> {
        Ok(self.lock()?.records.clone())
    }
}
