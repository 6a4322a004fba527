//! PostgreSQL price store.

use crate::domain::error::QuoteCacheError;
use crate::domain::price::{PricePoint, StoredRecord, next_write_timestamp};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::PriceStore;
use chrono::{DateTime, NaiveDate, Utc};
use postgres::NoTls;
use postgres::types::ToSql;
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;

type Manager = PostgresConnectionManager<NoTls>;

const SELECT_COLUMNS: &str = "SELECT id, written_at, symbol, date, open, high, low, close, volume \
                              FROM public.historical_prices";

pub struct PostgresAdapter {
    pool: Pool<Manager>,
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuoteCacheError> {
        let connection_string = config
            .get_string("postgres", "connection_string")
            .ok_or_else(|| QuoteCacheError::ConfigMissing {
                section: "postgres".into(),
                key: "connection_string".into(),
            })?;

        let pg_config: postgres::Config =
            connection_string
                .parse()
                .map_err(|e: postgres::Error| QuoteCacheError::ConfigInvalid {
                    section: "postgres".into(),
                    key: "connection_string".into(),
                    reason: e.to_string(),
                })?;

        let pool_size = config.get_int("postgres", "pool_size", 4).max(1) as u32;
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(PostgresConnectionManager::new(pg_config, NoTls))
            .map_err(|e: r2d2::Error| QuoteCacheError::Store {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn initialize_schema(&self) -> Result<(), QuoteCacheError> {
        self.connection()?
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS public.historical_prices (
                    id BIGSERIAL PRIMARY KEY,
                    written_at BIGINT NOT NULL,
                    symbol TEXT NOT NULL,
                    date DATE NOT NULL,
                    open NUMERIC NOT NULL,
                    high NUMERIC NOT NULL,
                    low NUMERIC NOT NULL,
                    close NUMERIC NOT NULL,
                    volume BIGINT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_historical_prices_symbol_date
                    ON public.historical_prices(symbol, date);",
            )
            .map_err(query_error)
    }

    fn connection(&self) -> Result<PooledConnection<Manager>, QuoteCacheError> {
        self.pool.get().map_err(|e: r2d2::Error| QuoteCacheError::Store {
            reason: e.to_string(),
        })
    }
}

impl PriceStore for PostgresAdapter {
    fn insert(&self, price: &PricePoint) -> Result<StoredRecord, QuoteCacheError> {
        let mut conn = self.connection()?;
        let mut tx = conn.transaction().map_err(query_error)?;

        // Serialise writers so each one sees the previous write timestamp.
        tx.batch_execute("LOCK TABLE public.historical_prices IN SHARE ROW EXCLUSIVE MODE")
            .map_err(query_error)?;

        let latest: Option<i64> = tx
            .query_one("SELECT MAX(written_at) FROM public.historical_prices", &[])
            .map_err(query_error)?
            .get(0);
        let written_at = next_write_timestamp(
            Utc::now(),
            latest.and_then(DateTime::from_timestamp_micros),
        );

        let volume = i64::try_from(price.volume).map_err(|_| QuoteCacheError::StoreQuery {
            reason: format!("volume {} does not fit BIGINT", price.volume),
        })?;
        let micros = written_at.timestamp_micros();
        let params: &[&(dyn ToSql + Sync)] = &[
            &micros,
            &price.symbol,
            &price.date,
            &price.open,
            &price.high,
            &price.low,
            &price.close,
            &volume,
        ];
        let id: i64 = tx
            .query_one(
                "INSERT INTO public.historical_prices \
                 (written_at, symbol, date, open, high, low, close, volume) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
                params,
            )
            .map_err(query_error)?
            .get(0);

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
        let query = format!("{SELECT_COLUMNS} WHERE symbol = $1 AND date = $2 ORDER BY id ASC");
        let rows = self
            .connection()?
            .query(query.as_str(), &[&symbol, &date])
            .map_err(query_error)?;
        rows.iter().map(read_record).collect()
    }

    fn query_all(&self) -> Result<Vec<StoredRecord>, QuoteCacheError> {
        let query = format!("{SELECT_COLUMNS} ORDER BY id ASC");
        let rows = self
            .connection()?
            .query(query.as_str(), &[])
            .map_err(query_error)?;
        rows.iter().map(read_record).collect()
    }
}

fn query_error(e: postgres::Error) -> QuoteCacheError {
    QuoteCacheError::StoreQuery {
        reason: e.to_string(),
    }
}

fn read_record(row: &postgres::Row) -> Result<StoredRecord, QuoteCacheError> {
    let micros: i64 = row.get(1);
    let written_at =
        DateTime::from_timestamp_micros(micros).ok_or_else(|| QuoteCacheError::StoreQuery {
            reason: format!("written_at {micros} out of range"),
        })?;
    let volume: i64 = row.get(8);

    Ok(StoredRecord {
        id: row.get(0),
        written_at,
        price: PricePoint {
            symbol: row.get(2),
            date: row.get(3),
            open: row.get(4),
            high: row.get(5),
            low: row.get(6),
            close: row.get(7),
            volume: u64::try_from(volume).map_err(|_| QuoteCacheError::StoreQuery {
                reason: format!("negative volume {volume}"),
            })?,
        },
    })
}
