//! Feed source trait and the HTTP client for the reference-rate feeds.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use refrates_common::PublicationMeta;
use reqwest::header::LAST_MODIFIED;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::{FxError, FxResult};

/// Default location of the daily snapshot.
pub const DEFAULT_DAILY_URL: &str = "https://www.ecb.europa.eu/stats/eurofxref/eurofxref-daily.xml";

/// Default location of the 90-day historical snapshot.
pub const DEFAULT_HISTORICAL_URL: &str =
    "https://www.ecb.europa.eu/stats/eurofxref/eurofxref-hist-90d.xml";

/// Which dataset to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// Latest single-day snapshot.
    Daily,
    /// Rolling 90-day series.
    Historical,
}

impl FeedKind {
    /// Cache key for the parsed dataset.
    pub fn cache_key(&self) -> &'static str {
        match self {
            FeedKind::Daily => "refrates:daily",
            FeedKind::Historical => "refrates:historical",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::Daily => write!(f, "daily"),
            FeedKind::Historical => write!(f, "historical"),
        }
    }
}

/// Raw payload returned by a feed source.
#[derive(Debug, Clone)]
pub struct RawFeed {
    pub kind: FeedKind,
    pub body: String,
    pub meta: PublicationMeta,
}

/// Trait for reference-rate feed sources.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &str;

    /// Fetch one dataset. Failures are returned as-is, never retried.
    async fn fetch(&self, kind: FeedKind) -> FxResult<RawFeed>;
}

/// Feed endpoint configuration.
#[derive(Debug, Clone)]
pub struct FeedEndpoints {
    /// Daily snapshot URL.
    pub daily_url: String,
    /// Historical snapshot URL.
    pub historical_url: String,
    /// Transport timeout for one request.
    pub timeout: Duration,
}

impl Default for FeedEndpoints {
    fn default() -> Self {
        Self {
            daily_url: DEFAULT_DAILY_URL.to_string(),
            historical_url: DEFAULT_HISTORICAL_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl FeedEndpoints {
    fn url(&self, kind: FeedKind) -> &str {
        match kind {
            FeedKind::Daily => &self.daily_url,
            FeedKind::Historical => &self.historical_url,
        }
    }
}

/// Fetches the feeds over HTTPS.
pub struct HttpFeedClient {
    client: Client,
    endpoints: FeedEndpoints,
}

impl HttpFeedClient {
    /// Create a client for the given endpoints.
    pub fn new(endpoints: FeedEndpoints) -> FxResult<Self> {
        let client = Client::builder()
            .timeout(endpoints.timeout)
            .build()
            .map_err(|e| FxError::Fetch {
                url: endpoints.daily_url.clone(),
                reason: format!("client setup failed: {}", e),
            })?;

        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &FeedEndpoints {
        &self.endpoints
    }
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    fn name(&self) -> &str {
        "HTTP"
    }

    async fn fetch(&self, kind: FeedKind) -> FxResult<RawFeed> {
        let url = self.endpoints.url(kind);
        let fetch_error = |reason: String| FxError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(feed = %kind, url, status = %status, "Feed returned non-success status");
            return Err(fetch_error(format!("unexpected status {}", status)));
        }

        let published_at = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_http_date);
        if published_at.is_none() {
            debug!(feed = %kind, "Feed response carries no usable Last-Modified header");
        }

        let body = response
            .text()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        info!(
            feed = %kind,
            bytes = body.len(),
            published_at = ?published_at,
            "Fetched feed"
        );

        Ok(RawFeed {
            kind,
            body,
            meta: PublicationMeta::new(published_at),
        })
    }
}

/// Parse an HTTP-date such as `Fri, 05 Jan 2024 15:00:00 GMT`.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Mock feed source for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockFeedSource {
    name: String,
    feeds: dashmap::DashMap<FeedKind, RawFeed>,
    fetches: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockFeedSource {
    /// Create a new mock source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feeds: dashmap::DashMap::new(),
            fetches: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Serve `body` for `kind`.
    pub fn set_feed(&self, kind: FeedKind, body: impl Into<String>, published_at: Option<DateTime<Utc>>) {
        self.feeds.insert(
            kind,
            RawFeed {
                kind,
                body: body.into(),
                meta: PublicationMeta::new(published_at),
            },
        );
    }

    /// Number of fetches served or attempted.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl FeedSource for MockFeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, kind: FeedKind) -> FxResult<RawFeed> {
        self.fetches.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.feeds
            .get(&kind)
            .map(|feed| feed.clone())
            .ok_or_else(|| FxError::Fetch {
                url: format!("mock://{}", kind),
                reason: "no feed configured".to_string(),
            })
    }
}
