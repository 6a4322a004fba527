//! SQLite price store.
//!
//! Prices are stored as decimal text so they round-trip exactly. Write
//! timestamps are integer microseconds since the Unix epoch.

use crate::domain::error::QuoteCacheError;
use crate::domain::price::{PricePoint, StoredRecord, next_write_timestamp};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::PriceStore;
use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Row, TransactionBehavior, params};
use rust_decimal::Decimal;
use std::str::FromStr;

const SELECT_COLUMNS: &str =
    "SELECT id, written_at, symbol, date, open, high, low, close, volume FROM historical_prices";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuoteCacheError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| QuoteCacheError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| QuoteCacheError::Store {
                    reason: e.to_string(),
                })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, QuoteCacheError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| QuoteCacheError::Store {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn initialize_schema(&self) -> Result<(), QuoteCacheError> {
        let conn = self.connection()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS historical_prices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                written_at INTEGER NOT NULL,
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                open TEXT NOT NULL,
                high TEXT NOT NULL,
                low TEXT NOT NULL,
                close TEXT NOT NULL,
                volume INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_historical_prices_symbol_date
                ON historical_prices(symbol, date);",
        )
        .map_err(query_error)?;

        Ok(())
    }

    fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, QuoteCacheError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| QuoteCacheError::Store {
                reason: e.to_string(),
            })
    }

    fn collect(
        conn: &rusqlite::Connection,
        query: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<StoredRecord>, QuoteCacheError> {
        let mut stmt = conn.prepare(query).map_err(query_error)?;
        let rows = stmt.query_map(params, read_record).map_err(query_error)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(query_error)?);
        }
        Ok(records)
    }
}

impl PriceStore for SqliteAdapter {
    fn insert(&self, price: &PricePoint) -> Result<StoredRecord, QuoteCacheError> {
        let volume = i64::try_from(price.volume).map_err(|_| QuoteCacheError::StoreQuery {
            reason: format!("volume {} does not fit INTEGER", price.volume),
        })?;
        let mut conn = self.connection()?;

        // IMMEDIATE takes the write lock up front so concurrent inserts
        // cannot read the same latest timestamp.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_error)?;

        let latest: Option<i64> = tx
            .query_row("SELECT MAX(written_at) FROM historical_prices", [], |row| {
                row.get(0)
            })
            .map_err(query_error)?;
        let written_at = next_write_timestamp(
            Utc::now(),
            latest.and_then(DateTime::from_timestamp_micros),
        );

        tx.execute(
            "INSERT INTO historical_prices (written_at, symbol, date, open, high, low, close, volume)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                written_at.timestamp_micros(),
                price.symbol,
                price.date.format("%Y-%m-%d").to_string(),
                price.open.to_string(),
                price.high.to_string(),
                price.low.to_string(),
                price.close.to_string(),
                volume
            ],
        )
        .map_err(query_error)?;
        let id = tx.last_insert_rowid();

        tx.commit().map_err(query_error)?;

        Ok(StoredRecord {
            id,
            written_at,
            price: price.clone(),
        })
    }

    fn query_by_date(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Vec<StoredRecord>, QuoteCacheError> {
        let conn = self.connection()?;
        let query = format!("{SELECT_COLUMNS} WHERE symbol = ?1 AND date = ?2 ORDER BY id ASC");
        Self::collect(
            &conn,
            &query,
            params![symbol, date.format("%Y-%m-%d").to_string()],
        )
    }

    fn query_all(&self) -> Result<Vec<StoredRecord>, QuoteCacheError> {
        let conn = self.connection()?;
        let query = format!("{SELECT_COLUMNS} ORDER BY id ASC");
        Self::collect(&conn, &query, [])
    }
}

fn query_error(e: rusqlite::Error) -> QuoteCacheError {
    QuoteCacheError::StoreQuery {
        reason: e.to_string(),
    }
}

fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn decimal_column(row: &Row<'_>, column: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(column)?;
    Decimal::from_str(&text).map_err(|e| conversion_error(column, e))
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
    let micros: i64 = row.get(1)?;
    let written_at = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(1, micros)
    })?;

    let date_str: String = row.get(3)?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .map_err(|e| conversion_error(3, e))?;

    let volume: i64 = row.get(8)?;

    Ok(StoredRecord {
        id: row.get(0)?,
        written_at,
        price: PricePoint {
            symbol: row.get(2)?,
            date,
            open: decimal_column(row, 4)?,
            high: decimal_column(row, 5)?,
            low: decimal_column(row, 6)?,
            close: decimal_column(row, 7)?,
            volume: u64::try_from(volume)
                .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(8, volume))?,
        },
    })
}
