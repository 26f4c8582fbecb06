//! Publication timing constants for RefRates.

use chrono::{Duration, NaiveTime};

/// Publication timing constants.
pub mod constants {
    use super::{Duration, NaiveTime};

    /// IANA zone the publisher's cutoff is expressed in.
    pub const PUBLISHER_TIMEZONE: &str = "Europe/Berlin";

    /// Nominal local publication time (16:00).
    pub fn publish_time() -> NaiveTime {
        NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default()
    }

    /// Margin subtracted from the publication time (10 minutes).
    pub fn safety_margin() -> Duration {
        Duration::minutes(10)
    }

    /// Freshness granted once the expected cutoff has passed (60 seconds).
    pub fn fallback_ttl() -> Duration {
        Duration::seconds(60)
    }
}
