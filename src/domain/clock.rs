//! Clock & Calendar (component C1).
//!
//! External collaborator: the core only depends on the trait. Market-hours
//! and holiday data are sourced from outside the core; on data failure the
//! trait returns `None`/`Unknown` and callers must abort rather than assume
//! the market is open (spec.md §4.1).

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use chrono_tz::America::New_York;
use serde::{Deserialize, Serialize};

use crate::domain::sleeve::SleeveKind;

/// Market open/close window for a given trading day, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketHours {
    pub open: DateTime<Utc>,
    pub close: DateTime<Utc>,
}

/// A sleeve's weekly entry window: weekday + local time-of-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryWindow {
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl EntryWindow {
    /// `start`/`end` are market-local clock times; `now` arrives as UTC
    /// from the ledger/clock boundary and must be converted to
    /// `America/New_York` before comparison, or a UTC afternoon reads as
    /// outside a window that's open by the exchange's own clock.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&New_York);
        local.weekday() == self.weekday
            && local.time() >= self.start
            && local.time() <= self.end
    }
}

/// Returns the configured weekly entry window for a sleeve kind, per
/// spec.md §4.5.1 ("Entry weekday" row of the constitution table).
pub fn entry_window_for(kind: SleeveKind) -> EntryWindow {
    use chrono::NaiveTime as T;
    match kind {
        SleeveKind::Generator => EntryWindow {
            weekday: Weekday::Thu,
            start: T::from_hms_opt(9, 45, 0).unwrap(),
            end: T::from_hms_opt(11, 0, 0).unwrap(),
        },
        SleeveKind::Revenue => EntryWindow {
            weekday: Weekday::Wed,
            start: T::from_hms_opt(9, 45, 0).unwrap(),
            end: T::from_hms_opt(11, 0, 0).unwrap(),
        },
        SleeveKind::Compounder | SleeveKind::MiniCompound | SleeveKind::ForkedRoot => EntryWindow {
            weekday: Weekday::Mon,
            start: T::from_hms_opt(9, 45, 0).unwrap(),
            end: T::from_hms_opt(11, 0, 0).unwrap(),
        },
    }
}

/// Abstract clock & calendar service (component C1). Implementations live in
/// `infrastructure` (a mock for tests, a real market-data-backed one in
/// production); the domain and application layers only ever see this trait.
#[async_trait]
pub trait ClockService: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// `None` means "unknown" (data failure) — callers must treat this as
    /// closed, never assume open (spec.md §4.1).
    async fn is_market_open(&self) -> Option<bool>;

    async fn next_entry_window(&self, kind: SleeveKind) -> Option<(DateTime<Utc>, DateTime<Utc>)>;

    async fn has_earnings(&self, symbol: &str, iso_week: (i32, u32)) -> Option<bool>;

    async fn is_safe_holiday(&self) -> Option<bool>;

    async fn market_hours(&self, date: chrono::NaiveDate) -> Option<MarketHours>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_am_eastern_is_inside_the_generator_window_even_in_utc() {
        // 2026-07-30T14:00:00Z is 10:00 EDT on a Thursday.
        let now = DateTime::parse_from_rfc3339("2026-07-30T14:00:00Z").unwrap().with_timezone(&Utc);
        assert!(entry_window_for(SleeveKind::Generator).contains(now));
    }

    #[test]
    fn same_utc_instant_is_outside_a_non_matching_weekday_window() {
        let now = DateTime::parse_from_rfc3339("2026-07-30T14:00:00Z").unwrap().with_timezone(&Utc);
        assert!(!entry_window_for(SleeveKind::Revenue).contains(now));
    }

    #[test]
    fn naive_utc_time_of_day_would_have_missed_the_window() {
        let now = DateTime::parse_from_rfc3339("2026-07-30T14:00:00Z").unwrap().with_timezone(&Utc);
        assert_ne!(now.time(), now.with_timezone(&New_York).time());
    }
}
