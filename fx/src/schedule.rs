//! Publication-aware cache lifetimes.
//!
//! The publisher releases one dataset per business day at a fixed local
//! wall-clock time. A fetched dataset stays fresh until shortly before the
//! next expected release; after that point callers get a short lifetime so
//! they retry soon without hammering the source.

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use refrates_common::time::constants;
use tracing::debug;

/// Days searched for the next business day before giving up.
const MAX_LOOKAHEAD_DAYS: usize = 366;

/// The publisher's release cadence.
#[derive(Debug, Clone)]
pub struct PublicationSchedule {
    /// Zone the release time is expressed in.
    pub timezone: Tz,
    /// Nominal local release time.
    pub publish_time: NaiveTime,
    /// How long before the nominal release the cutoff falls.
    pub safety_margin: Duration,
    /// Lifetime granted once the cutoff has passed.
    pub fallback: Duration,
    /// Weekdays on which nothing is published.
    holidays: Vec<NaiveDate>,
}

impl Default for PublicationSchedule {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Berlin,
            publish_time: constants::publish_time(),
            safety_margin: constants::safety_margin(),
            fallback: constants::fallback_ttl(),
            holidays: Vec::new(),
        }
    }
}

impl PublicationSchedule {
    /// Create a schedule with an explicit zone and release time.
    pub fn new(timezone: Tz, publish_time: NaiveTime) -> Self {
        Self {
            timezone,
            publish_time,
            ..Self::default()
        }
    }

    /// Set the safety margin.
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Set the fallback lifetime.
    pub fn with_fallback(mut self, fallback: Duration) -> Self {
        self.fallback = fallback;
        self
    }

    /// Set the non-publishing weekdays.
    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        for date in holidays {
            self.add_holiday(date);
        }
        self
    }

    /// Add a non-publishing weekday.
    pub fn add_holiday(&mut self, date: NaiveDate) {
        if !self.holidays.contains(&date) {
            self.holidays.push(date);
            self.holidays.sort();
        }
    }

    fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Check if a dataset is expected on this date.
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !Self::is_weekend(date) && !self.holidays.contains(&date)
    }

    /// First business day strictly after `date`.
    pub fn next_business_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        let mut current = date;
        for _ in 0..MAX_LOOKAHEAD_DAYS {
            current = current.succ_opt()?;
            if self.is_business_day(current) {
                return Some(current);
            }
        }
        None
    }

    /// Instant after which a dataset published at `published_at` is stale.
    pub fn next_cutoff(&self, published_at: DateTime<Utc>) -> Option<DateTime<Tz>> {
        let published_local = published_at.with_timezone(&self.timezone);
        let next_day = self.next_business_day(published_local.date_naive())?;
        let cutoff = next_day.and_time(self.publish_time) - self.safety_margin;
        self.resolve_local(cutoff)
    }

    /// Whole seconds a dataset published at `published_at` stays fresh at `now`.
    pub fn ttl_seconds(&self, now: DateTime<Utc>, published_at: DateTime<Utc>) -> u64 {
        let Some(cutoff) = self.next_cutoff(published_at) else {
            return self.fallback_seconds();
        };

        let now_local = now.with_timezone(&self.timezone);
        let remaining = cutoff.signed_duration_since(now_local).num_seconds();
        let ttl = match u64::try_from(remaining) {
            Ok(secs) if secs > 0 => secs,
            _ => self.fallback_seconds(),
        };

        debug!(
            published_at = %published_at,
            cutoff = %cutoff,
            ttl_secs = ttl,
            "Computed cache lifetime"
        );
        ttl
    }

    /// Like [`PublicationSchedule::ttl_seconds`]; an unknown publication instant
    /// gets the fallback lifetime.
    pub fn ttl_for(&self, now: DateTime<Utc>, published_at: Option<DateTime<Utc>>) -> u64 {
        match published_at {
            Some(published_at) => self.ttl_seconds(now, published_at),
            None => self.fallback_seconds(),
        }
    }

    /// Fallback lifetime in whole seconds.
    pub fn fallback_seconds(&self) -> u64 {
        u64::try_from(self.fallback.num_seconds()).unwrap_or(0)
    }

    /// Map a local wall-clock time to an instant. Ambiguous times take the
    /// earlier instant; times inside a DST gap move forward until they exist.
    fn resolve_local(&self, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
        (0..=8)
            .map(|step| naive + Duration::minutes(15 * step))
            .find_map(|candidate| self.timezone.from_local_datetime(&candidate).earliest())
    }
}
