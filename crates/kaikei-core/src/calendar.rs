//! # Accounting Calendar
//!
//! Maps real instants onto business dates.
//!
//! ## The Business Day
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A business date owns everything from its opening time up to (but not  │
//! │  excluding-the-first-moment-of) the next opening time:                  │
//! │                                                                         │
//! │     civil date      Jun 12              Jun 13              Jun 14     │
//! │     ─────────────┬───────────────────┬───────────────────┬──────────   │
//! │                17:00               17:00               17:00            │
//! │                  ├───── Jun 12 ──────┤────── Jun 13 ─────┤             │
//! │                                                                         │
//! │  so a checkout at 00:20 on civil Jun 13 still belongs to business       │
//! │  Jun 12 when the store opens at 17:00. The mapping is monotone: later   │
//! │  instants never land on earlier business dates.                         │
//! │                                                                         │
//! │  All comparisons happen in the store's timezone; the resulting          │
//! │  periods are half-open UTC intervals [open, next open).                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this module reads the wall clock. Callers that need "now" take
//! a [`Clock`], so every calendar decision is replayable in tests.

use std::fmt;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::hours::BusinessHours;

// =============================================================================
// Clock
// =============================================================================

/// Source of the current instant.
///
/// Production code uses [`SystemClock`]; tests pin time with [`FixedClock`]
/// so date-boundary behavior can be asserted exactly.
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current instant in UTC.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn at(instant: DateTime<Utc>) -> Self {
        FixedClock(instant)
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

// =============================================================================
// Business-Date Mapping
// =============================================================================

impl BusinessHours {
    /// The business date that owns `instant`.
    ///
    /// Local time-of-day before the opening time belongs to the previous
    /// civil date's business day.
    ///
    /// ## Example
    /// ```rust
    /// use kaikei_core::hours::BusinessHours;
    /// use chrono::NaiveDate;
    /// use chrono_tz::Asia::Tokyo;
    ///
    /// let hours = BusinessHours::from_strings("17:00", "26:00", Tokyo).unwrap();
    /// // 00:20 JST on Jun 13 = 15:20 UTC on Jun 12
    /// let instant = "2025-06-12T15:20:00Z".parse().unwrap();
    /// assert_eq!(
    ///     hours.accounting_date(instant),
    ///     NaiveDate::from_ymd_opt(2025, 6, 12).unwrap()
    /// );
    /// ```
    pub fn accounting_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        let local = instant.with_timezone(&self.tz);
        if local.time() < self.open {
            (local - Duration::days(1)).date_naive()
        } else {
            local.date_naive()
        }
    }

    /// The half-open UTC interval `[open, next open)` covered by a business
    /// date.
    pub fn accounting_period(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start_local = date.and_time(self.open);
        let end_local = start_local + Duration::hours(24);
        (localize(self.tz, start_local), localize(self.tz, end_local))
    }

    /// The period that owns `instant`.
    pub fn accounting_period_containing(
        &self,
        instant: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        self.accounting_period(self.accounting_date(instant))
    }
}

/// Civil (midnight-to-midnight) date of an instant in a timezone.
///
/// Fallback mapping for stores with no configured hours.
pub fn civil_date(tz: Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Civil-day UTC interval `[midnight, next midnight)` in a timezone.
pub fn civil_day_period(tz: Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_local = date.and_time(NaiveTime::MIN);
    let end_local = start_local + Duration::hours(24);
    (localize(tz, start_local), localize(tz, end_local))
}

/// Resolves a local wall-clock datetime to a UTC instant.
///
/// DST makes this non-total: a spring-forward gap wall time never occurs
/// (slide forward to the first hour that does), and a fall-back wall time
/// occurs twice (take the earlier instant so consecutive periods stay
/// contiguous). If the timezone tables give nothing at all, read the naive
/// value as UTC rather than fail.
fn localize(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => tz
            .from_local_datetime(&(local + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&local)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;
    use chrono_tz::Asia::Tokyo;

    fn overnight() -> BusinessHours {
        BusinessHours::from_strings("17:00", "26:00", Tokyo).unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_late_night_belongs_to_previous_business_date() {
        // 00:20 JST Jun 13 is before the 17:00 open, so it is still
        // business Jun 12.
        let instant = utc("2025-06-12T15:20:00Z");
        assert_eq!(overnight().accounting_date(instant), date("2025-06-12"));
    }

    #[test]
    fn test_evening_belongs_to_same_business_date() {
        // 19:00 JST Jun 12 = 10:00 UTC
        let instant = utc("2025-06-12T10:00:00Z");
        assert_eq!(overnight().accounting_date(instant), date("2025-06-12"));
    }

    #[test]
    fn test_open_instant_starts_the_new_business_date() {
        // Exactly 17:00 JST Jun 13 = 08:00 UTC
        let at_open = utc("2025-06-13T08:00:00Z");
        assert_eq!(overnight().accounting_date(at_open), date("2025-06-13"));

        // One minute earlier still belongs to Jun 12.
        let before_open = utc("2025-06-13T07:59:00Z");
        assert_eq!(overnight().accounting_date(before_open), date("2025-06-12"));
    }

    #[test]
    fn test_accounting_date_is_monotone() {
        let hours = overnight();
        let start = utc("2025-06-11T00:00:00Z");
        let mut previous = hours.accounting_date(start);
        // Sweep three days in 10-minute steps.
        for step in 1..(3 * 24 * 6) {
            let instant = start + Duration::minutes(10 * step);
            let current = hours.accounting_date(instant);
            assert!(current >= previous, "date regressed at {}", instant);
            previous = current;
        }
    }

    #[test]
    fn test_period_is_open_to_next_open() {
        let (start, end) = overnight().accounting_period(date("2025-06-12"));
        // 17:00 JST = 08:00 UTC, same time next day.
        assert_eq!(start, utc("2025-06-12T08:00:00Z"));
        assert_eq!(end, utc("2025-06-13T08:00:00Z"));
    }

    #[test]
    fn test_period_agrees_with_accounting_date() {
        let hours = overnight();
        let day = date("2025-06-12");
        let (start, end) = hours.accounting_period(day);

        // Start is inclusive, end is exclusive.
        assert_eq!(hours.accounting_date(start), day);
        assert_eq!(hours.accounting_date(end - Duration::seconds(1)), day);
        assert_ne!(hours.accounting_date(end), day);
    }

    #[test]
    fn test_period_containing() {
        let hours = overnight();
        let instant = utc("2025-06-12T15:20:00Z");
        let (start, end) = hours.accounting_period_containing(instant);
        assert!(start <= instant && instant < end);
        assert_eq!(start, utc("2025-06-12T08:00:00Z"));
        assert_eq!(end, utc("2025-06-13T08:00:00Z"));
    }

    #[test]
    fn test_midnight_open_matches_civil_date() {
        let hours = BusinessHours::from_strings("00:00", "23:59", Tokyo).unwrap();
        for s in [
            "2025-06-12T15:00:00Z",
            "2025-06-12T14:59:00Z",
            "2025-06-13T02:00:00Z",
        ] {
            let instant = utc(s);
            assert_eq!(
                hours.accounting_date(instant),
                civil_date(Tokyo, instant),
                "at {}",
                s
            );
        }
    }

    #[test]
    fn test_civil_day_period() {
        let (start, end) = civil_day_period(Tokyo, date("2025-06-12"));
        // JST midnight = 15:00 UTC the previous day.
        assert_eq!(start, utc("2025-06-11T15:00:00Z"));
        assert_eq!(end, utc("2025-06-12T15:00:00Z"));
    }

    #[test]
    fn test_spring_forward_gap_slides_to_first_valid_hour() {
        // New York, Mar 9 2025: 02:00-02:59 never occurs. An 02:30 open
        // resolves to 03:30 EDT = 07:30 UTC.
        let hours = BusinessHours::from_strings("02:30", "10:00", New_York).unwrap();
        let (start, _) = hours.accounting_period(date("2025-03-09"));
        assert_eq!(start, utc("2025-03-09T07:30:00Z"));
    }

    #[test]
    fn test_fall_back_overlap_takes_earlier_instant() {
        // New York, Nov 2 2025: 01:30 occurs twice (EDT then EST). The
        // earlier reading keeps consecutive periods contiguous.
        let hours = BusinessHours::from_strings("01:30", "09:00", New_York).unwrap();
        let (start, _) = hours.accounting_period(date("2025-11-02"));
        assert_eq!(start, utc("2025-11-02T05:30:00Z"));
    }

    #[test]
    fn test_fixed_clock_reports_its_instant() {
        let instant = utc("2025-06-12T15:20:00Z");
        let clock = FixedClock::at(instant);
        assert_eq!(clock.now_utc(), instant);
        assert_eq!(clock.now_utc(), instant);
    }
}
