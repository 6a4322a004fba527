//! Historical price resolution over a store and a remote quote source.
//!
//! Every requested date is served from the store when it holds at least one
//! record for the key, and fetched remotely otherwise. Fetched prices are
//! written back, so a warm store answers repeat queries without remote calls.
//! Nothing here locks: two callers missing the same key will both fetch and
//! both insert, and the next read reconciles the duplicates.

use crate::domain::date_span::{DateSpan, parse_range};
use crate::domain::error::QuoteCacheError;
use crate::domain::freshness::{pick_freshest, reconcile_all};
use crate::domain::price::{LastTradedPrice, PricePoint, StoredRecord, SymbolInfo};
use crate::domain::query::{PriceQuery, QueryPlan};
use crate::ports::clock_port::Clock;
use crate::ports::quote_port::QuotePort;
use crate::ports::store_port::PriceStore;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

pub struct PriceResolver<'a> {
    store: &'a dyn PriceStore,
    quotes: &'a dyn QuotePort,
    clock: &'a dyn Clock,
}

impl<'a> PriceResolver<'a> {
    pub fn new(store: &'a dyn PriceStore, quotes: &'a dyn QuotePort, clock: &'a dyn Clock) -> Self {
        Self {
            store,
            quotes,
            clock,
        }
    }

    /// Resolve a query into one price per date, oldest first.
    ///
    /// `None` for `range` or `date` means omitted. See [`PriceQuery::plan`]
    /// for validation order and precedence.
    pub fn resolve(
        &self,
        symbol: &str,
        range: Option<&str>,
        date: Option<&str>,
    ) -> Result<Vec<PricePoint>, QuoteCacheError> {
        let query = PriceQuery {
            symbol: symbol.to_string(),
            range: range.map(str::to_string),
            date: date.map(str::to_string),
        };
        self.resolve_query(&query)
    }

    pub fn resolve_query(&self, query: &PriceQuery) -> Result<Vec<PricePoint>, QuoteCacheError> {
        let symbol = query.symbol.as_str();
        match query.plan(self.clock.today())? {
            QueryPlan::Date(date) => Ok(self.resolve_date(symbol, date)?.into_iter().collect()),
            QueryPlan::DateWithRange { date, range } => Ok(self
                .resolve_date_with_range(symbol, &range, date)?
                .into_iter()
                .collect()),
            QueryPlan::Span(span) => self.resolve_range(symbol, &span),
        }
    }

    /// One price for `date`: the freshest stored record, or else the last
    /// record the remote source returns, which is then stored.
    pub fn resolve_date(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>, QuoteCacheError> {
        if let Some(hit) = self.lookup(symbol, date)? {
            return Ok(Some(hit));
        }

        let fetched = self.quotes.fetch_by_date(symbol, date)?;
        info!(symbol, %date, records = fetched.len(), "fetched by date");
        self.write_back(symbol, date, fetched.into_iter().last())
    }

    /// Like [`Self::resolve_date`], but a miss goes through the remote
    /// combined date+range call and keeps its first record.
    pub fn resolve_date_with_range(
        &self,
        symbol: &str,
        range: &str,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>, QuoteCacheError> {
        if let Some(hit) = self.lookup(symbol, date)? {
            return Ok(Some(hit));
        }

        let fetched = self.quotes.fetch_by_date_and_range(symbol, range, date)?;
        info!(symbol, range, %date, records = fetched.len(), "fetched by date and range");
        self.write_back(symbol, date, fetched.into_iter().next())
    }

    /// Resolve each date of `span` in ascending order, skipping dates
    /// without data. The first failure aborts the whole span.
    pub fn resolve_range(
        &self,
        symbol: &str,
        span: &DateSpan,
    ) -> Result<Vec<PricePoint>, QuoteCacheError> {
        let mut prices = Vec::with_capacity(span.len());
        for date in span.dates() {
            if let Some(price) = self.resolve_date(symbol, date)? {
                prices.push(price);
            }
        }
        debug!(symbol, days = span.len(), found = prices.len(), "resolved span");
        Ok(prices)
    }

    /// Store every remotely fetched price inside `range` that is not cached
    /// yet, with a single remote call. Returns how many records were written.
    pub fn warm_range(&self, symbol: &str, range: &str) -> Result<usize, QuoteCacheError> {
        if symbol.trim().is_empty() {
            return Err(QuoteCacheError::MissingSymbol);
        }
        let span = parse_range(range, self.clock.today())?;

        let fetched = self.quotes.fetch_by_range(symbol, range)?;
        info!(symbol, range, records = fetched.len(), "fetched by range");

        let mut written = 0;
        for price in fetched.iter().filter(|p| span.contains(p.date)) {
            if self.store.query_by_date(symbol, price.date)?.is_empty() {
                self.store.insert(price)?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Every stored price, one per `(symbol, date)`, ordered by symbol then date.
    pub fn cached_prices(&self, symbol: Option<&str>) -> Result<Vec<StoredRecord>, QuoteCacheError> {
        let records = self.store.query_all()?;
        let mut reconciled = reconcile_all(&records);
        if let Some(symbol) = symbol {
            reconciled.retain(|r| r.price.symbol == symbol);
        }
        Ok(reconciled)
    }

    pub fn list_symbols(&self) -> Result<Vec<SymbolInfo>, QuoteCacheError> {
        self.quotes.list_symbols()
    }

    pub fn last_traded_prices(
        &self,
        symbols: &[String],
    ) -> Result<Vec<LastTradedPrice>, QuoteCacheError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        self.quotes.last_traded_prices(symbols)
    }

    fn lookup(&self, symbol: &str, date: NaiveDate) -> Result<Option<PricePoint>, QuoteCacheError> {
        let records = self.store.query_by_date(symbol, date)?;
        if records.len() > 1 {
            warn!(symbol, %date, duplicates = records.len(), "reconciling duplicate records");
        }
        let hit = pick_freshest(&records).map(|r| r.price.clone());
        if hit.is_some() {
            debug!(symbol, %date, "store hit");
        }
        Ok(hit)
    }

    fn write_back(
        &self,
        symbol: &str,
        date: NaiveDate,
        fetched: Option<PricePoint>,
    ) -> Result<Option<PricePoint>, QuoteCacheError> {
        let Some(price) = fetched else {
            debug!(symbol, %date, "no remote data");
            return Ok(None);
        };
        let record = self.store.insert(&price)?;
        debug!(symbol, %date, id = record.id, "stored fetched price");
        Ok(Some(record.price))
    }
}
