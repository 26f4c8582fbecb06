//! Rate tables as published by the reference-rate feed.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::currency::Currency;
use crate::error::RateTableError;

/// Anchor-relative rates for a single publication date.
///
/// The anchor currency is never stored; [`RateTable::rate`] answers one for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    /// Publication date.
    pub date: NaiveDate,
    rates: BTreeMap<Currency, Decimal>,
}

impl RateTable {
    /// Create an empty table for a date.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            rates: BTreeMap::new(),
        }
    }

    /// Build a table from `(currency, rate)` pairs. Later duplicates win.
    pub fn from_rates(
        date: NaiveDate,
        rates: impl IntoIterator<Item = (Currency, Decimal)>,
    ) -> Result<Self, RateTableError> {
        let mut table = Self::new(date);
        for (currency, rate) in rates {
            table.insert(currency, rate)?;
        }
        Ok(table)
    }

    /// Insert or replace a rate.
    pub fn insert(&mut self, currency: Currency, rate: Decimal) -> Result<(), RateTableError> {
        if currency.is_anchor() {
            return Err(RateTableError::AnchorListed(currency.code().to_string()));
        }
        if rate <= Decimal::ZERO {
            return Err(RateTableError::NonPositiveRate {
                currency: currency.code().to_string(),
                rate: rate.to_string(),
            });
        }
        self.rates.insert(currency, rate);
        Ok(())
    }

    /// Rate of `currency` against the anchor.
    ///
    /// The anchor reads as one. Missing and zero rates both read as `None`.
    pub fn rate(&self, currency: &Currency) -> Option<Decimal> {
        if currency.is_anchor() {
            return Some(Decimal::ONE);
        }
        self.rates
            .get(currency)
            .copied()
            .filter(|rate| !rate.is_zero())
    }

    /// Stored rates, sorted by code. The anchor is not included.
    pub fn rates(&self) -> &BTreeMap<Currency, Decimal> {
        &self.rates
    }

    /// Every currency readable through [`RateTable::rate`], anchor included.
    pub fn currencies(&self) -> Vec<Currency> {
        let mut currencies: Vec<Currency> = self.rates.keys().cloned().collect();
        currencies.push(Currency::anchor());
        currencies.sort();
        currencies
    }

    /// Number of stored rates.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Rate tables across many publication dates, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    tables: Vec<RateTable>,
}

impl HistoricalSeries {
    /// Build a series, merging tables that share a date and sorting by date descending.
    pub fn from_tables(tables: impl IntoIterator<Item = RateTable>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, RateTable> = BTreeMap::new();
        for table in tables {
            match by_date.entry(table.date) {
                Entry::Vacant(slot) => {
                    slot.insert(table);
                }
                Entry::Occupied(mut slot) => {
                    // Rates were validated on insertion into `table`.
                    slot.get_mut().rates.extend(table.rates);
                }
            }
        }

        Self {
            tables: by_date.into_values().rev().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RateTable> {
        self.tables.iter()
    }

    /// Publication dates, most recent first.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.tables.iter().map(|t| t.date).collect()
    }

    /// Most recent table.
    pub fn latest(&self) -> Option<&RateTable> {
        self.tables.first()
    }

    /// Table for a specific date.
    pub fn get(&self, date: NaiveDate) -> Option<&RateTable> {
        self.tables.iter().find(|t| t.date == date)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Publication metadata reported by the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationMeta {
    /// When the source last modified the dataset, if reported.
    pub published_at: Option<DateTime<Utc>>,
}

impl PublicationMeta {
    pub fn new(published_at: Option<DateTime<Utc>>) -> Self {
        Self { published_at }
    }
}
