//! Currency codes and the validation sets used by the rate feeds.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CurrencyError;

/// Code of the anchor currency every published rate is quoted against.
pub const ANCHOR_CODE: &str = "EUR";

/// Codes quoted in the live daily publication.
pub const CURRENT_CODES: &[&str] = &[
    "AUD", "BRL", "CAD", "CHF", "CNY", "CZK", "DKK", "GBP", "HKD", "HUF", "IDR", "ILS", "INR",
    "ISK", "JPY", "KRW", "MXN", "MYR", "NOK", "NZD", "PHP", "PLN", "RON", "SEK", "SGD", "THB",
    "TRY", "USD", "ZAR",
];

/// Codes that only appear in historical publications.
pub const LEGACY_CODES: &[&str] = &[
    "BGN", "CYP", "EEK", "HRK", "LTL", "LVL", "MTL", "ROL", "RUB", "SIT", "SKK", "TRL",
];

/// ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    /// Create a new currency from code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// The anchor currency (implicit rate of one).
    pub fn anchor() -> Self {
        Self::new(ANCHOR_CODE)
    }

    /// Whether this is the anchor currency.
    pub fn is_anchor(&self) -> bool {
        self.0 == ANCHOR_CODE
    }

    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn gbp() -> Self {
        Self::new("GBP")
    }

    pub fn jpy() -> Self {
        Self::new("JPY")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The set of codes a lookup is validated against.
///
/// Live conversions only accept currencies that are still published, while
/// historical lookups also accept codes that have since been withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencySet {
    Current,
    Historical,
}

impl CurrencySet {
    /// Check membership. The anchor belongs to both sets.
    pub fn contains(&self, currency: &Currency) -> bool {
        let code = currency.code();
        if code == ANCHOR_CODE || CURRENT_CODES.contains(&code) {
            return true;
        }
        match self {
            CurrencySet::Current => false,
            CurrencySet::Historical => LEGACY_CODES.contains(&code),
        }
    }

    /// Normalize a raw code and check it belongs to this set.
    pub fn validate(&self, raw: &str) -> Result<Currency, CurrencyError> {
        let trimmed = raw.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CurrencyError::Malformed(raw.to_string()));
        }

        let currency = Currency::new(trimmed);
        if self.contains(&currency) {
            Ok(currency)
        } else {
            Err(CurrencyError::Unknown {
                code: currency.code().to_string(),
                set: *self,
            })
        }
    }

    /// All codes in this set, anchor included, sorted.
    pub fn codes(&self) -> Vec<Currency> {
        let mut codes: Vec<Currency> = std::iter::once(ANCHOR_CODE)
            .chain(CURRENT_CODES.iter().copied())
            .map(Currency::new)
            .collect();
        if *self == CurrencySet::Historical {
            codes.extend(LEGACY_CODES.iter().copied().map(Currency::new));
        }
        codes.sort();
        codes
    }
}

impl fmt::Display for CurrencySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurrencySet::Current => write!(f, "current"),
            CurrencySet::Historical => write!(f, "historical"),
        }
    }
}
