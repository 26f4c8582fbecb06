//! FX engine error types.

use chrono::NaiveDate;
use refrates_common::{Currency, CurrencyError, RateTableError};
use thiserror::Error;

/// Errors that can occur in the FX engine.
#[derive(Debug, Error)]
pub enum FxError {
    /// Transport failure reaching the feed, or a non-success status.
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Payload does not match the expected feed schema.
    #[error("Feed parse error: {0}")]
    Parse(String),

    /// Requested currency is outside the relevant set.
    #[error(transparent)]
    UnknownCurrency(#[from] CurrencyError),

    /// A rate needed for the computation is absent or zero.
    #[error("No usable rate for {currency} on {date}")]
    ZeroOrMissingRate { currency: Currency, date: NaiveDate },

    /// Requested amount is not a positive number.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Decimal overflow while converting.
    #[error("Arithmetic overflow: {0}")]
    Arithmetic(String),

    /// Cache store failure.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Cache payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FxError {
    /// Whether the error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, FxError::UnknownCurrency(_) | FxError::InvalidAmount(_))
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::Fetch { .. } => "FETCH_FAILED",
            FxError::Parse(_) => "PARSE_FAILED",
            FxError::UnknownCurrency(e) => e.error_code(),
            FxError::ZeroOrMissingRate { .. } => "RATE_NOT_AVAILABLE",
            FxError::InvalidAmount(_) => "INVALID_AMOUNT",
            FxError::Arithmetic(_) => "ARITHMETIC_OVERFLOW",
            FxError::Cache(_) => "CACHE_ERROR",
            FxError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl From<RateTableError> for FxError {
    fn from(err: RateTableError) -> Self {
        FxError::Parse(err.to_string())
    }
}

impl From<quick_xml::Error> for FxError {
    fn from(err: quick_xml::Error) -> Self {
        FxError::Parse(err.to_string())
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
