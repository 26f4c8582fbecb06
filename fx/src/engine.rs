//! Rate service: cache lookup, feed fetch, scheduling and conversion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use refrates_common::{HistoricalSeries, PublicationMeta, RateTable};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cache::CacheStore;
use crate::conversion::{
    self, ConversionRequest, ConversionResponse, ConversionResult, Lookup, ValidatedRequest,
};
use crate::error::FxResult;
use crate::parser;
use crate::provider::{FeedKind, FeedSource};
use crate::schedule::PublicationSchedule;

/// Parsed dataset as written to the cache store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedFeed<T> {
    pub meta: PublicationMeta,
    pub data: T,
}

/// A dataset together with its freshness.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub data: T,
    pub meta: PublicationMeta,
    /// Seconds the dataset may still be treated as fresh.
    pub cache_ttl_secs: u64,
    /// Whether the dataset came from the cache store.
    pub from_cache: bool,
}

/// Datasets the service knows how to parse.
trait FeedData: Serialize + DeserializeOwned + Send {
    const KIND: FeedKind;

    fn parse(body: &str) -> FxResult<Self>;
}

impl FeedData for RateTable {
    const KIND: FeedKind = FeedKind::Daily;

    fn parse(body: &str) -> FxResult<Self> {
        parser::parse_daily(body)
    }
}

impl FeedData for HistoricalSeries {
    const KIND: FeedKind = FeedKind::Historical;

    fn parse(body: &str) -> FxResult<Self> {
        parser::parse_historical(body)
    }
}

/// The rate service.
///
/// Holds no mutable state of its own; concurrent misses on the same key may
/// both fetch, and whichever writes last wins.
pub struct RateService {
    source: Arc<dyn FeedSource>,
    cache: Arc<dyn CacheStore>,
    schedule: PublicationSchedule,
}

impl RateService {
    /// Create a new service.
    pub fn new(
        source: Arc<dyn FeedSource>,
        cache: Arc<dyn CacheStore>,
        schedule: PublicationSchedule,
    ) -> Self {
        Self {
            source,
            cache,
            schedule,
        }
    }

    pub fn schedule(&self) -> &PublicationSchedule {
        &self.schedule
    }

    /// Latest daily table.
    pub async fn daily(&self, now: DateTime<Utc>) -> FxResult<Snapshot<RateTable>> {
        self.load(now).await
    }

    /// Rolling historical series.
    pub async fn historical(&self, now: DateTime<Utc>) -> FxResult<Snapshot<HistoricalSeries>> {
        self.load(now).await
    }

    /// Validate, load the relevant dataset and convert.
    #[instrument(skip(self, request), fields(
        source = %request.source,
        target = ?request.target,
        lookup = ?request.lookup
    ))]
    pub async fn convert(
        &self,
        request: &ConversionRequest,
        now: DateTime<Utc>,
    ) -> FxResult<ConversionResponse> {
        // Reject bad input before touching the cache or the network.
        let request = request.validate()?;

        let response = match request.lookup {
            Lookup::Live => {
                let snapshot = self.daily(now).await?;
                Self::convert_live(&request, snapshot)?
            }
            Lookup::Historical => {
                let snapshot = self.historical(now).await?;
                Self::convert_historical(&request, snapshot)?
            }
        };

        debug!(
            dates = response.dates.len(),
            ttl_secs = response.cache_ttl_secs,
            "Conversion completed"
        );
        Ok(response)
    }

    /// Convert using the current clock.
    pub async fn convert_now(&self, request: &ConversionRequest) -> FxResult<ConversionResponse> {
        self.convert(request, Utc::now()).await
    }

    fn convert_live(
        request: &ValidatedRequest,
        snapshot: Snapshot<RateTable>,
    ) -> FxResult<ConversionResponse> {
        let table = snapshot.data;
        let result = match &request.target {
            Some(target) => ConversionResult::Pair {
                date: table.date,
                rate: conversion::pairwise(&table, &request.source, target, request.amount)?,
                from: request.source.clone(),
                to: target.clone(),
                amount: request.amount,
            },
            None => ConversionResult::Rebased {
                date: table.date,
                rates: conversion::rebase(&table, &request.source, request.amount)?,
                base: request.source.clone(),
                amount: request.amount,
            },
        };

        Ok(ConversionResponse {
            result,
            dates: vec![table.date],
            cache_ttl_secs: snapshot.cache_ttl_secs,
        })
    }

    fn convert_historical(
        request: &ValidatedRequest,
        snapshot: Snapshot<HistoricalSeries>,
    ) -> FxResult<ConversionResponse> {
        let series = snapshot.data;
        let result = match &request.target {
            Some(target) => ConversionResult::Historical {
                rates: conversion::historical_pairwise(
                    &series,
                    &request.source,
                    target,
                    request.amount,
                )?,
                from: request.source.clone(),
                to: target.clone(),
                amount: request.amount,
            },
            None => ConversionResult::HistoricalRebased {
                tables: conversion::historical_rebase(&series, &request.source, request.amount)?,
                base: request.source.clone(),
                amount: request.amount,
            },
        };

        Ok(ConversionResponse {
            result,
            dates: series.dates(),
            cache_ttl_secs: snapshot.cache_ttl_secs,
        })
    }

    #[instrument(skip(self), fields(feed = %T::KIND))]
    async fn load<T: FeedData>(&self, now: DateTime<Utc>) -> FxResult<Snapshot<T>> {
        let key = T::KIND.cache_key();

        if let Some(cached) = self.read_cache::<T>(key).await {
            // A hit is authoritative until the store expires it.
            return Ok(Snapshot {
                cache_ttl_secs: self.schedule.ttl_for(now, cached.meta.published_at),
                data: cached.data,
                meta: cached.meta,
                from_cache: true,
            });
        }

        let raw = self.source.fetch(T::KIND).await?;
        let data = T::parse(&raw.body)?;
        let ttl = self.schedule.ttl_for(now, raw.meta.published_at);

        let entry = CachedFeed {
            meta: raw.meta,
            data,
        };
        let payload = serde_json::to_string(&entry)?;
        if let Err(e) = self.cache.put(key, payload, ttl).await {
            warn!(key, error = %e, "Failed to store dataset in cache");
        }

        info!(
            source = self.source.name(),
            published_at = ?entry.meta.published_at,
            ttl_secs = ttl,
            "Loaded dataset from feed"
        );

        Ok(Snapshot {
            data: entry.data,
            meta: entry.meta,
            cache_ttl_secs: ttl,
            from_cache: false,
        })
    }

    /// Read and decode a cache entry. Failures degrade to a miss.
    async fn read_cache<T: FeedData>(&self, key: &str) -> Option<CachedFeed<T>> {
        let payload = match self.cache.get(key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::conversion::DatedRate;
    use crate::error::FxError;
    use crate::fixtures::{DAILY_XML, HISTORICAL_XML};
    use crate::provider::MockFeedSource;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use refrates_common::Currency;
    use rust_decimal_macros::dec;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup_service() -> (RateService, Arc<MockFeedSource>, Arc<MemoryCacheStore>) {
        let source = Arc::new(MockFeedSource::new("test"));
        // Friday 16:00 CET.
        let published = Some(utc(2024, 1, 5, 15, 0));
        source.set_feed(FeedKind::Daily, DAILY_XML, published);
        source.set_feed(FeedKind::Historical, HISTORICAL_XML, published);

        let cache = Arc::new(MemoryCacheStore::new());
        let service = RateService::new(
            source.clone(),
            cache.clone(),
            PublicationSchedule::default(),
        );
        (service, source, cache)
    }

    #[tokio::test]
    async fn test_daily_miss_then_hit() {
        let (service, source, cache) = setup_service();
        let now = utc(2024, 1, 6, 12, 0);

        let first = service.daily(now).await.unwrap();
        assert!(!first.from_cache);
        assert_eq!(first.cache_ttl_secs, 183_000);
        assert_eq!(cache.len(), 1);

        let second = service.daily(now).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.data, first.data);
        assert_eq!(second.meta, first.meta);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_publication_instant_gets_fallback_ttl() {
        let source = Arc::new(MockFeedSource::new("test"));
        source.set_feed(FeedKind::Daily, DAILY_XML, None);
        let service = RateService::new(
            source,
            Arc::new(MemoryCacheStore::new()),
            PublicationSchedule::default(),
        );

        let snapshot = service.daily(utc(2024, 1, 6, 12, 0)).await.unwrap();
        assert_eq!(snapshot.cache_ttl_secs, 60);
    }

    #[tokio::test]
    async fn test_convert_pair() {
        let (service, _, _) = setup_service();
        let request = ConversionRequest::new("usd").to("GBP").amount(dec!(100));

        let response = service.convert(&request, utc(2024, 1, 6, 12, 0)).await.unwrap();

        assert_eq!(response.dates, vec![date(2024, 1, 5)]);
        assert_eq!(response.cache_ttl_secs, 183_000);
        match response.result {
            ConversionResult::Pair { from, to, rate, .. } => {
                assert_eq!(from, Currency::usd());
                assert_eq!(to, Currency::gbp());
                assert_eq!(rate.round_dp(2), dec!(78.80));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_convert_rebase() {
        let (service, _, _) = setup_service();
        let request = ConversionRequest::new("EUR");

        let response = service.convert(&request, utc(2024, 1, 6, 12, 0)).await.unwrap();

        match response.result {
            ConversionResult::Rebased { base, rates, .. } => {
                assert_eq!(base, Currency::anchor());
                assert_eq!(rates.len(), 5);
                assert_eq!(rates[&Currency::anchor()], dec!(1));
                assert_eq!(rates[&Currency::usd()], dec!(1.0921));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_convert_historical_keeps_every_date() {
        let (service, _, _) = setup_service();
        let request = ConversionRequest::new("USD").to("GBP").historical();

        let response = service.convert(&request, utc(2024, 1, 6, 12, 0)).await.unwrap();

        assert_eq!(
            response.dates,
            vec![date(2024, 1, 5), date(2024, 1, 4), date(2024, 1, 3)]
        );
        match response.result {
            ConversionResult::Historical { rates, .. } => {
                assert_eq!(rates.len(), 3);
                assert!(rates[0].rate.is_some());
                assert_eq!(rates[1], DatedRate { date: date(2024, 1, 4), rate: None });
                assert!(rates[2].rate.is_some());
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_convert_historical_rebase() {
        let (service, _, _) = setup_service();
        let request = ConversionRequest::new("GBP").historical();

        let response = service.convert(&request, utc(2024, 1, 6, 12, 0)).await.unwrap();

        match response.result {
            ConversionResult::HistoricalRebased { tables, .. } => {
                assert_eq!(tables.len(), 3);
                assert!(tables[1].rates.is_none());
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_currency_rejected_before_fetch() {
        let (service, source, cache) = setup_service();

        let live = ConversionRequest::new("HRK").to("USD");
        let result = service.convert(&live, utc(2024, 1, 6, 12, 0)).await;

        assert!(matches!(result, Err(FxError::UnknownCurrency(_))));
        assert_eq!(source.fetch_count(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_missing_pair_rate_fails_live() {
        let (service, _, _) = setup_service();
        let request = ConversionRequest::new("USD").to("ZAR");

        let result = service.convert(&request, utc(2024, 1, 6, 12, 0)).await;

        assert!(matches!(result, Err(FxError::ZeroOrMissingRate { .. })));
    }

    #[tokio::test]
    async fn test_fetch_and_parse_errors_propagate() {
        let source = Arc::new(MockFeedSource::new("test"));
        source.set_feed(FeedKind::Daily, "<html>maintenance</html>", None);
        let service = RateService::new(
            source.clone(),
            Arc::new(MemoryCacheStore::new()),
            PublicationSchedule::default(),
        );

        let parse = service.daily(utc(2024, 1, 6, 12, 0)).await;
        assert!(matches!(parse, Err(FxError::Parse(_))));

        let fetch = service.historical(utc(2024, 1, 6, 12, 0)).await;
        assert!(matches!(fetch, Err(FxError::Fetch { .. })));
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_cache_entry_is_a_miss() {
        let (service, source, cache) = setup_service();
        cache
            .put(FeedKind::Daily.cache_key(), "not json".to_string(), 600)
            .await
            .unwrap();

        let snapshot = service.daily(utc(2024, 1, 6, 12, 0)).await.unwrap();

        assert!(!snapshot.from_cache);
        assert_eq!(source.fetch_count(), 1);
    }

    struct FailingCache;

    #[async_trait]
    impl CacheStore for FailingCache {
        async fn get(&self, _key: &str) -> FxResult<Option<String>> {
            Err(FxError::Cache("connection refused".to_string()))
        }

        async fn put(&self, _key: &str, _value: String, _ttl_secs: u64) -> FxResult<()> {
            Err(FxError::Cache("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_cache_failures_degrade_to_fetch() {
        let source = Arc::new(MockFeedSource::new("test"));
        source.set_feed(FeedKind::Daily, DAILY_XML, None);
        let service = RateService::new(
            source.clone(),
            Arc::new(FailingCache),
            PublicationSchedule::default(),
        );

        let snapshot = service.daily(utc(2024, 1, 6, 12, 0)).await.unwrap();
        assert_eq!(snapshot.data.date, date(2024, 1, 5));
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_cold_misses_converge() {
        let (service, source, cache) = setup_service();
        let service = Arc::new(service);
        let now = utc(2024, 1, 6, 12, 0);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.daily(now).await })
            })
            .collect();

        let mut tables = Vec::new();
        for handle in handles {
            tables.push(handle.await.unwrap().unwrap().data);
        }

        assert!(tables.windows(2).all(|w| w[0] == w[1]));
        assert!((1..=4).contains(&source.fetch_count()));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_cache_roundtrip_is_lossless() {
        let (service, _, cache) = setup_service();
        let now = utc(2024, 1, 6, 12, 0);

        let fetched = service.historical(now).await.unwrap();
        let payload = cache
            .get(FeedKind::Historical.cache_key())
            .await
            .unwrap()
            .unwrap();
        let decoded: CachedFeed<HistoricalSeries> = serde_json::from_str(&payload).unwrap();

        assert_eq!(decoded.data, fetched.data);
        assert_eq!(decoded.meta, fetched.meta);
    }
}
