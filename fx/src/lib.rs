//! RefRates FX Engine
//!
//! Acquisition, caching and conversion of central-bank reference rates.
//!
//! # Features
//!
//! - Daily and 90-day historical feed fetching with publication metadata
//! - Strict feed parsing into anchor-relative rate tables
//! - Cache lifetimes that follow the publisher's business-day release cutoff
//! - Rebased, pairwise and per-date historical conversions
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use refrates_fx::{ConversionRequest, FeedEndpoints, HttpFeedClient, MemoryCacheStore,
//!     PublicationSchedule, RateService};
//!
//! let source = Arc::new(HttpFeedClient::new(FeedEndpoints::default())?);
//! let service = RateService::new(source, Arc::new(MemoryCacheStore::new()),
//!     PublicationSchedule::default());
//!
//! let request = ConversionRequest::new("USD").to("GBP").amount(dec!(100));
//! let response = service.convert_now(&request).await?;
//! ```

pub mod engine;
pub mod provider;
pub mod parser;
pub mod schedule;
pub mod cache;
pub mod conversion;
pub mod error;

#[cfg(test)]
mod fixtures;

pub use engine::{CachedFeed, RateService, Snapshot};
pub use provider::{FeedEndpoints, FeedKind, FeedSource, HttpFeedClient, RawFeed};
pub use parser::{parse_daily, parse_historical};
pub use schedule::PublicationSchedule;
pub use cache::{CacheStore, MemoryCacheStore};
pub use conversion::{ConversionRequest, ConversionResponse, ConversionResult, DatedRate, Lookup};
pub use error::{FxError, FxResult};
