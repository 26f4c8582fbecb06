//! Currency conversion over anchor-relative rate tables.
//!
//! Every cross rate is `rate[target] / rate[source]`, computed before the
//! amount is applied. Zero or missing rates are never used as divisors.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use refrates_common::{Currency, CurrencySet, HistoricalSeries, RateTable};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FxError, FxResult};

/// Amount used when a request does not name one.
pub const DEFAULT_AMOUNT: Decimal = Decimal::ONE;

/// Rate between a fixed pair on one publication date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedRate {
    pub date: NaiveDate,
    /// `None` when either side had no usable rate on that date.
    pub rate: Option<Decimal>,
}

/// Rebased table on one publication date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedRates {
    pub date: NaiveDate,
    /// `None` when the base currency had no usable rate on that date.
    pub rates: Option<BTreeMap<Currency, Decimal>>,
}

/// Rebase a table onto `source`, scaled by `amount`.
///
/// The anchor is included; `result[source] == amount`.
pub fn rebase(
    table: &RateTable,
    source: &Currency,
    amount: Decimal,
) -> FxResult<BTreeMap<Currency, Decimal>> {
    ensure_positive(amount)?;
    let source_rate = usable_rate(table, source)?;

    let mut rebased = BTreeMap::new();
    for currency in table.currencies() {
        if let Some(rate) = table.rate(&currency) {
            rebased.insert(currency, cross(source_rate, rate, amount)?);
        }
    }
    Ok(rebased)
}

/// Convert `amount` of `source` into `target`.
pub fn pairwise(
    table: &RateTable,
    source: &Currency,
    target: &Currency,
    amount: Decimal,
) -> FxResult<Decimal> {
    ensure_positive(amount)?;
    let source_rate = usable_rate(table, source)?;
    let target_rate = usable_rate(table, target)?;
    cross(source_rate, target_rate, amount)
}

/// Pairwise conversion on every date of a series.
///
/// The output has one entry per input date; dates lacking either rate
/// carry `None` instead of failing the whole request.
pub fn historical_pairwise(
    series: &HistoricalSeries,
    source: &Currency,
    target: &Currency,
    amount: Decimal,
) -> FxResult<Vec<DatedRate>> {
    ensure_positive(amount)?;

    Ok(series
        .iter()
        .map(|table| DatedRate {
            date: table.date,
            rate: pairwise(table, source, target, amount)
                .map_err(|e| degrade(table.date, &e))
                .ok(),
        })
        .collect())
}

/// Rebase every date of a series onto `source`.
pub fn historical_rebase(
    series: &HistoricalSeries,
    source: &Currency,
    amount: Decimal,
) -> FxResult<Vec<DatedRates>> {
    ensure_positive(amount)?;

    Ok(series
        .iter()
        .map(|table| DatedRates {
            date: table.date,
            rates: rebase(table, source, amount)
                .map_err(|e| degrade(table.date, &e))
                .ok(),
        })
        .collect())
}

fn degrade(date: NaiveDate, err: &FxError) {
    if !matches!(err, FxError::ZeroOrMissingRate { .. }) {
        warn!(date = %date, error = %err, "Dropping historical entry");
    }
}

fn usable_rate(table: &RateTable, currency: &Currency) -> FxResult<Decimal> {
    table
        .rate(currency)
        .ok_or_else(|| FxError::ZeroOrMissingRate {
            currency: currency.clone(),
            date: table.date,
        })
}

fn cross(source_rate: Decimal, target_rate: Decimal, amount: Decimal) -> FxResult<Decimal> {
    target_rate
        .checked_div(source_rate)
        .and_then(|ratio| ratio.checked_mul(amount))
        .ok_or_else(|| {
            FxError::Arithmetic(format!(
                "{} / {} * {} is out of range",
                target_rate, source_rate, amount
            ))
        })
}

fn ensure_positive(amount: Decimal) -> FxResult<()> {
    if amount <= Decimal::ZERO {
        return Err(FxError::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

/// Which dataset a request reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lookup {
    /// Latest daily snapshot.
    #[default]
    Live,
    /// Rolling historical series.
    Historical,
}

impl Lookup {
    /// Currency codes accepted for this lookup.
    pub fn currency_set(&self) -> CurrencySet {
        match self {
            Lookup::Live => CurrencySet::Current,
            Lookup::Historical => CurrencySet::Historical,
        }
    }
}

/// Request to perform a conversion.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Source currency code as received.
    pub source: String,
    /// Optional target currency code.
    pub target: Option<String>,
    /// Optional amount, defaults to one.
    pub amount: Option<Decimal>,
    /// Dataset to read.
    pub lookup: Lookup,
}

impl ConversionRequest {
    /// Create a live rebase request for `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: None,
            amount: None,
            lookup: Lookup::Live,
        }
    }

    /// Convert into a single target currency.
    pub fn to(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the amount.
    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Read the historical series instead of the daily snapshot.
    pub fn historical(mut self) -> Self {
        self.lookup = Lookup::Historical;
        self
    }

    /// Check codes and amount without touching any data.
    pub fn validate(&self) -> FxResult<ValidatedRequest> {
        let set = self.lookup.currency_set();
        let source = set.validate(&self.source)?;
        let target = self
            .target
            .as_deref()
            .map(|code| set.validate(code))
            .transpose()?;
        let amount = self.amount.unwrap_or(DEFAULT_AMOUNT);
        ensure_positive(amount)?;

        Ok(ValidatedRequest {
            source,
            target,
            amount,
            lookup: self.lookup,
        })
    }
}

/// Request whose codes belong to the relevant set and whose amount is positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub source: Currency,
    pub target: Option<Currency>,
    pub amount: Decimal,
    pub lookup: Lookup,
}

/// Outcome of a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionResult {
    /// Full table rebased to `base`.
    Rebased {
        date: NaiveDate,
        base: Currency,
        amount: Decimal,
        rates: BTreeMap<Currency, Decimal>,
    },
    /// Single pairwise value.
    Pair {
        date: NaiveDate,
        from: Currency,
        to: Currency,
        amount: Decimal,
        rate: Decimal,
    },
    /// Pairwise value on each historical date.
    Historical {
        from: Currency,
        to: Currency,
        amount: Decimal,
        rates: Vec<DatedRate>,
    },
    /// Rebased table on each historical date.
    HistoricalRebased {
        base: Currency,
        amount: Decimal,
        tables: Vec<DatedRates>,
    },
}

/// Result plus what the caller needs for freshness headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResponse {
    pub result: ConversionResult,
    /// Publication dates the result was computed from, most recent first.
    pub dates: Vec<NaiveDate>,
    /// Recommended cache lifetime in seconds.
    pub cache_ttl_secs: u64,
}
