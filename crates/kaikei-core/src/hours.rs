//! # Business Hours
//!
//! Parsing, normalization, and display of store operating hours.
//!
//! ## The Overflow-Hour Notation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Izakaya hours are written the way staff think about them:             │
//! │                                                                         │
//! │      open "17:00"  close "26:00"                                        │
//! │                           └──── means 02:00 *the next morning*          │
//! │                                                                         │
//! │  The hour component may run up to 29 (= 05:00 next day). Internally    │
//! │  we never carry that form around: it normalizes at the boundary to     │
//! │                                                                         │
//! │      close = 02:00, crosses_midnight = true                             │
//! │                                                                         │
//! │  and `close_display()` re-renders "26:00" for UI collaborators.        │
//! │  parse → display is lossless for every overflow input (see tests).     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveTime, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Clock-Time Parsing
// =============================================================================

/// Parses a wall-clock string in `HH:MM` form, allowing hours 00-29.
///
/// Returns the normalized time (hour mod 24) and whether the hour carried
/// into the next day (hour ≥ 24).
///
/// ## Example
/// ```rust
/// use kaikei_core::hours::parse_clock_time;
/// use chrono::NaiveTime;
///
/// let (t, next_day) = parse_clock_time("26:00").unwrap();
/// assert_eq!(t, NaiveTime::from_hms_opt(2, 0, 0).unwrap());
/// assert!(next_day);
///
/// let (t, next_day) = parse_clock_time("17:30").unwrap();
/// assert_eq!(t, NaiveTime::from_hms_opt(17, 30, 0).unwrap());
/// assert!(!next_day);
/// ```
pub fn parse_clock_time(input: &str) -> CoreResult<(NaiveTime, bool)> {
    let invalid = |reason: &str| CoreError::InvalidTimeFormat {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let (hours, minutes) = input
        .split_once(':')
        .ok_or_else(|| invalid("expected HH:MM"))?;

    if hours.is_empty() || hours.len() > 2 || !hours.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("hours must be one or two digits"));
    }
    if minutes.len() != 2 || !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("minutes must be two digits"));
    }

    let hour: u32 = hours.parse().map_err(|_| invalid("hours must be numeric"))?;
    let minute: u32 = minutes
        .parse()
        .map_err(|_| invalid("minutes must be numeric"))?;

    if hour > 29 {
        return Err(invalid("hours must be between 00 and 29"));
    }
    if minute > 59 {
        return Err(invalid("minutes must be between 00 and 59"));
    }

    let carries = hour >= 24;
    let time =
        NaiveTime::from_hms_opt(hour % 24, minute, 0).ok_or_else(|| invalid("invalid time"))?;

    Ok((time, carries))
}

/// Renders a normalized time back to `HH:MM`, re-applying the overflow form
/// when the time belongs to the next day.
///
/// Exact inverse of [`parse_clock_time`]: `format_overflow_time` of a parsed
/// `(time, carry)` pair reproduces the original string.
pub fn format_overflow_time(time: NaiveTime, next_day: bool) -> String {
    let hour = time.hour() + if next_day { 24 } else { 0 };
    format!("{:02}:{:02}", hour, time.minute())
}

// =============================================================================
// Business Hours
// =============================================================================

/// A store's daily operating schedule, normalized.
///
/// `close` is always a plain 00:00-23:59 time; a close after midnight is
/// carried by `crosses_midnight` instead of an hour ≥ 24. The business day
/// itself runs from `open` to `open` + 24h (see the calendar module) - the
/// nominal close only matters for display and for deriving the flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BusinessHours {
    /// Opening time. Always 00:00-23:59 (overflow form is rejected here).
    #[ts(as = "String")]
    pub open: NaiveTime,
    /// Closing time, normalized mod 24.
    #[ts(as = "String")]
    pub close: NaiveTime,
    /// True when the schedule runs past midnight.
    pub crosses_midnight: bool,
    /// The store's business timezone.
    #[ts(as = "String")]
    pub tz: Tz,
}

impl BusinessHours {
    /// Builds a schedule from already-normalized parts (e.g. database
    /// columns).
    pub fn new(open: NaiveTime, close: NaiveTime, crosses_midnight: bool, tz: Tz) -> Self {
        BusinessHours {
            open,
            close,
            crosses_midnight,
            tz,
        }
    }

    /// Parses a schedule from configuration strings.
    ///
    /// ## Rules
    /// - `open` must be a plain 00:00-23:59 time
    /// - `close` may use the overflow form (24:00-29:59 = next day)
    /// - a plain close earlier than the open ("17:00"-"02:00") also counts
    ///   as crossing midnight and canonicalizes to the overflow display form
    ///
    /// ## Example
    /// ```rust
    /// use kaikei_core::hours::BusinessHours;
    /// use chrono_tz::Asia::Tokyo;
    ///
    /// let hours = BusinessHours::from_strings("17:00", "26:00", Tokyo).unwrap();
    /// assert!(hours.crosses_midnight);
    /// assert_eq!(hours.close_display(), "26:00");
    /// ```
    pub fn from_strings(open: &str, close: &str, tz: Tz) -> CoreResult<Self> {
        let (open_time, open_carries) = parse_clock_time(open)?;
        if open_carries {
            return Err(CoreError::InvalidTimeFormat {
                input: open.to_string(),
                reason: "opening time must be between 00:00 and 23:59".to_string(),
            });
        }

        let (close_time, close_carries) = parse_clock_time(close)?;
        let crosses_midnight = close_carries || close_time < open_time;

        Ok(BusinessHours {
            open: open_time,
            close: close_time,
            crosses_midnight,
            tz,
        })
    }

    /// Opening time as `HH:MM`.
    pub fn open_display(&self) -> String {
        format_overflow_time(self.open, false)
    }

    /// Closing time as `HH:MM`, using the overflow form (hour ≥ 24) when the
    /// schedule crosses midnight.
    pub fn close_display(&self) -> String {
        format_overflow_time(self.close, self.crosses_midnight)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
