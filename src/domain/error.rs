//! Domain error types.

/// How an error should be surfaced to whoever called the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    BadRequest,
    Upstream,
    Internal,
}

/// Top-level error type for quotecache.
#[derive(Debug, thiserror::Error)]
pub enum QuoteCacheError {
    #[error("symbol is required")]
    MissingSymbol,

    #[error("invalid range {range:?}: {reason}")]
    InvalidRange { range: String, reason: String },

    #[error("invalid date {date:?}: {reason}")]
    InvalidDate { date: String, reason: String },

    #[error("remote fetch from {source_name} failed: {reason}")]
    RemoteFetch { source_name: String, reason: String },

    #[error("store error: {reason}")]
    Store { reason: String },

    #[error("store query error: {reason}")]
    StoreQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuoteCacheError {
    pub fn invalid_range(range: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            range: range.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_date(date: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDate {
            date: date.to_string(),
            reason: reason.into(),
        }
    }

    pub fn remote(source_name: &str, reason: impl Into<String>) -> Self {
        Self::RemoteFetch {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            QuoteCacheError::MissingSymbol => ErrorClass::NotFound,
            QuoteCacheError::InvalidRange { .. }
            | QuoteCacheError::InvalidDate { .. }
            | QuoteCacheError::ConfigParse { .. }
            | QuoteCacheError::ConfigMissing { .. }
            | QuoteCacheError::ConfigInvalid { .. } => ErrorClass::BadRequest,
            QuoteCacheError::RemoteFetch { .. } => ErrorClass::Upstream,
            QuoteCacheError::Store { .. }
            | QuoteCacheError::StoreQuery { .. }
            | QuoteCacheError::Io(_) => ErrorClass::Internal,
        }
    }
}

impl From<&QuoteCacheError> for std::process::ExitCode {
    fn from(err: &QuoteCacheError) -> Self {
        let code: u8 = match err {
            QuoteCacheError::Io(_) => 1,
            QuoteCacheError::ConfigParse { .. }
            | QuoteCacheError::ConfigMissing { .. }
            | QuoteCacheError::ConfigInvalid { .. } => 2,
            QuoteCacheError::Store { .. } | QuoteCacheError::StoreQuery { .. } => 3,
            QuoteCacheError::MissingSymbol
            | QuoteCacheError::InvalidRange { .. }
            | QuoteCacheError::InvalidDate { .. } => 4,
            QuoteCacheError::RemoteFetch { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
