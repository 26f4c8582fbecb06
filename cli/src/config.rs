//! Service configuration.

use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use refrates_common::time::constants;
use refrates_fx::provider::{DEFAULT_DAILY_URL, DEFAULT_HISTORICAL_URL};
use refrates_fx::{FeedEndpoints, PublicationSchedule};

/// Main service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Daily snapshot URL.
    pub daily_url: String,
    /// Historical snapshot URL.
    pub historical_url: String,
    /// Transport timeout for one feed request.
    pub http_timeout: Duration,
    /// IANA zone of the publication cutoff.
    pub timezone: String,
    /// Local publication time, `HH:MM`.
    pub publish_time: String,
    /// Minutes before the publication time at which data goes stale.
    pub safety_margin_minutes: i64,
    /// Cache lifetime once the cutoff has passed.
    pub fallback_ttl_secs: i64,
    /// Log level.
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            daily_url: DEFAULT_DAILY_URL.to_string(),
            historical_url: DEFAULT_HISTORICAL_URL.to_string(),
            http_timeout: Duration::from_secs(10),
            timezone: constants::PUBLISHER_TIMEZONE.to_string(),
            publish_time: constants::publish_time().format("%H:%M").to_string(),
            safety_margin_minutes: constants::safety_margin().num_minutes(),
            fallback_ttl_secs: constants::fallback_ttl().num_seconds(),
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("REFRATES_DAILY_URL") {
            config.daily_url = url;
        }

        if let Ok(url) = std::env::var("REFRATES_HISTORICAL_URL") {
            config.historical_url = url;
        }

        if let Ok(secs) = std::env::var("REFRATES_HTTP_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.http_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(tz) = std::env::var("REFRATES_TIMEZONE") {
            config.timezone = tz;
        }

        if let Ok(time) = std::env::var("REFRATES_PUBLISH_TIME") {
            config.publish_time = time;
        }

        if let Ok(minutes) = std::env::var("REFRATES_SAFETY_MARGIN_MINUTES") {
            if let Ok(minutes) = minutes.parse() {
                config.safety_margin_minutes = minutes;
            }
        }

        if let Ok(secs) = std::env::var("REFRATES_FALLBACK_TTL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.fallback_ttl_secs = secs;
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.daily_url.is_empty() || self.historical_url.is_empty() {
            return Err("Feed URLs cannot be empty".to_string());
        }

        if self.http_timeout.is_zero() {
            return Err("HTTP timeout cannot be 0".to_string());
        }

        if !(0..24 * 60).contains(&self.safety_margin_minutes) {
            return Err("Safety margin must be between 0 and 1439 minutes".to_string());
        }

        if self.fallback_ttl_secs <= 0 {
            return Err("Fallback TTL must be positive".to_string());
        }

        self.schedule().map(|_| ())
    }

    /// Build the publication schedule.
    pub fn schedule(&self) -> Result<PublicationSchedule, String> {
        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|_| format!("Unknown timezone: {}", self.timezone))?;
        let publish_time = NaiveTime::parse_from_str(&self.publish_time, "%H:%M")
            .map_err(|e| format!("Invalid publish time {:?}: {}", self.publish_time, e))?;

        Ok(PublicationSchedule::new(timezone, publish_time)
            .with_safety_margin(chrono::Duration::minutes(self.safety_margin_minutes))
            .with_fallback(chrono::Duration::seconds(self.fallback_ttl_secs)))
    }

    /// Build the feed endpoints.
    pub fn endpoints(&self) -> FeedEndpoints {
        FeedEndpoints {
            daily_url: self.daily_url.clone(),
            historical_url: self.historical_url.clone(),
            timeout: self.http_timeout,
        }
    }
}
