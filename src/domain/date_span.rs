//! Calendar spans and the range-token parser.
//!
//! A range token is a short relative window such as `5d`, `3m`, `2y`, `max`
//! or `ytd`. Parsing anchors the window at `today`, which is always the
//! inclusive end of the resulting [`DateSpan`].

use crate::domain::error::QuoteCacheError;
use chrono::{Datelike, Days, Months, NaiveDate};

/// Years covered by the `max` token.
pub const MAX_RANGE_YEARS: u32 = 15;

/// Days covered when a query names neither a range nor a date.
pub const DEFAULT_WINDOW_DAYS: u64 = 30;

/// Inclusive, gapless, ascending run of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateSpan {
    /// Returns `None` when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days in the span (never zero).
    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

/// The window used when a query names neither a range nor a date.
pub fn default_window(today: NaiveDate) -> DateSpan {
    let start = today
        .checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MIN);
    DateSpan { start, end: today }
}

/// Parse a range token into the span ending at `today`.
///
/// Tokens are case-insensitive: `max`, `ytd`, or `<digits><d|m|y>`.
pub fn parse_range(range: &str, today: NaiveDate) -> Result<DateSpan, QuoteCacheError> {
    if range.is_empty() {
        return Err(QuoteCacheError::invalid_range(range, "range must not be empty"));
    }

    let token = range.to_ascii_lowercase();
    let start = match token.as_str() {
        "max" => today.checked_sub_months(Months::new(MAX_RANGE_YEARS * 12)),
        "ytd" => NaiveDate::from_ymd_opt(today.year(), 1, 1),
        custom => Some(custom_range_start(range, custom, today)?),
    }
    .ok_or_else(|| QuoteCacheError::invalid_range(range, "window starts before the calendar"))?;

    DateSpan::new(start, today)
        .ok_or_else(|| QuoteCacheError::invalid_range(range, "window starts after today"))
}

fn custom_range_start(
    raw: &str,
    token: &str,
    today: NaiveDate,
) -> Result<NaiveDate, QuoteCacheError> {
    let Some(unit) = token.chars().last() else {
        return Err(QuoteCacheError::invalid_range(raw, "range must not be empty"));
    };
    let digits = &token[..token.len() - unit.len_utf8()];

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QuoteCacheError::invalid_range(
            raw,
            "expected <number><d|m|y>, max or ytd",
        ));
    }

    let amount: u32 = digits
        .parse()
        .map_err(|_| QuoteCacheError::invalid_range(raw, "magnitude is too large"))?;

    let start = match unit {
        'd' => today.checked_sub_days(Days::new(u64::from(amount))),
        'm' => today.checked_sub_months(Months::new(amount)),
        'y' => amount
            .checked_mul(12)
            .and_then(|months| today.checked_sub_months(Months::new(months))),
        other => {
            return Err(QuoteCacheError::invalid_range(
                raw,
                format!("unknown unit '{other}'"),
            ));
        }
    };

    start.ok_or_else(|| QuoteCacheError::invalid_range(raw, "window starts before the calendar"))
}

/// Strict `YYYYMMDD` parsing for query dates.
pub fn parse_query_date(date: &str) -> Result<NaiveDate, QuoteCacheError> {
    if date.is_empty() {
        return Err(QuoteCacheError::invalid_date(date, "date must not be empty"));
    }
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QuoteCacheError::invalid_date(date, "expected YYYYMMDD"));
    }
    NaiveDate::parse_from_str(date, "%Y%m%d")
        .map_err(|e| QuoteCacheError::invalid_date(date, e.to_string()))
}

/// Inverse of [`parse_query_date`].
pub fn format_query_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}
