//! Validation and classification of historical price queries.

use crate::domain::date_span::{DateSpan, default_window, parse_query_date, parse_range};
use crate::domain::error::QuoteCacheError;
use chrono::NaiveDate;

/// A caller's request, exactly as received.
///
/// `None` means the parameter was omitted; `Some("")` means it was supplied
/// empty, which is an error for both `range` and `date`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceQuery {
    pub symbol: String,
    pub range: Option<String>,
    pub date: Option<String>,
}

impl PriceQuery {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Validate and decide which dates to resolve.
    ///
    /// Checks run in a fixed order: symbol, then range emptiness, then date.
    /// When both a date and a range are present the date decides the output;
    /// the range token is carried along untouched for the remote call.
    pub fn plan(&self, today: NaiveDate) -> Result<QueryPlan, QuoteCacheError> {
        if self.symbol.trim().is_empty() {
            return Err(QuoteCacheError::MissingSymbol);
        }
        if self.range.as_deref() == Some("") {
            return Err(QuoteCacheError::invalid_range("", "range must not be empty"));
        }
        if self.date.as_deref() == Some("") {
            return Err(QuoteCacheError::invalid_date("", "date must not be empty"));
        }

        let plan = match (self.range.as_deref(), self.date.as_deref()) {
            (Some(range), Some(date)) => QueryPlan::DateWithRange {
                date: parse_query_date(date)?,
                range: range.to_string(),
            },
            (None, None) => QueryPlan::Span(default_window(today)),
            (None, Some(date)) => QueryPlan::Date(parse_query_date(date)?),
            (Some(range), None) => QueryPlan::Span(parse_range(range, today)?),
        };
        Ok(plan)
    }
}

/// What a validated query resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    Date(NaiveDate),
    DateWithRange { date: NaiveDate, range: String },
    Span(DateSpan),
}
