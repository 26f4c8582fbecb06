//! Error types shared by the RefRates crates.

use crate::CurrencySet;
use thiserror::Error;

/// Errors raised while validating a requested currency code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// The code is not three ASCII letters.
    #[error("Malformed currency code: {0:?}")]
    Malformed(String),

    /// The code is well-formed but not part of the validation set.
    #[error("Unknown {set} currency: {code}")]
    Unknown { code: String, set: CurrencySet },
}

impl CurrencyError {
    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            CurrencyError::Malformed(_) => "MALFORMED_CURRENCY",
            CurrencyError::Unknown { .. } => "UNKNOWN_CURRENCY",
        }
    }
}

/// Errors raised when a rate table invariant would be violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateTableError {
    /// The anchor currency was given an explicit rate.
    #[error("Anchor currency {0} cannot carry an explicit rate")]
    AnchorListed(String),

    /// Rates must be strictly positive.
    #[error("Non-positive rate {rate} for {currency}")]
    NonPositiveRate { currency: String, rate: String },
}
