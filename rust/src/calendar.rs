//! Business calendar arithmetic on an 8-on/16-off daily cycle.
//!
//! Work is consumed between 08:00 and 16:00. Subtracting work time walks
//! backwards through calendar time and then snaps the result onto the
//! working window:
//! 1. whole workdays are removed as calendar days, the remainder as plain time;
//! 2. a result before 08:00 skips the 16 non-working hours once;
//! 3. a result at exactly 16:00 is rewritten as the following 08:00;
//! 4. a result on a weekend steps back one calendar day at a time
//!    (time-of-day unchanged) until it lands on a weekday.

use chrono::{Datelike, Duration, NaiveDateTime, Timelike, Weekday};

/// Length of one workday in milliseconds.
pub const WORKDAY_MILLIS: i64 = 8 * 60 * 60 * 1000;

/// Hour at which the workday starts.
pub const WORKDAY_START_HOUR: u32 = 8;

/// Hour at which the workday ends.
pub const WORKDAY_END_HOUR: u32 = 16;

/// Non-working hours between the end of one workday and the start of the next.
pub const OFF_HOURS: i64 = 16;

/// How weekends are treated by [`BusinessCalendar::subtract`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WeekendPolicy {
    /// Results on Saturday or Sunday step back to the preceding Friday.
    #[default]
    Skip,
    /// Plain 8-on/16-off arithmetic; weekends are ordinary days.
    Ignore,
}

impl WeekendPolicy {
    pub fn from_skip_flag(skip_weekends: bool) -> Self {
        if skip_weekends {
            Self::Skip
        } else {
            Self::Ignore
        }
    }
}

/// Workday calendar used by the backward pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusinessCalendar {
    pub weekends: WeekendPolicy,
}

impl BusinessCalendar {
    pub fn new(weekends: WeekendPolicy) -> Self {
        Self { weekends }
    }

    /// Return the instant `duration_millis` of working time before `instant`,
    /// or `None` if the result falls outside the representable date range.
    ///
    /// `duration_millis` must be non-negative; the task graph rejects
    /// negative estimates before they reach the calendar.
    pub fn subtract(&self, instant: NaiveDateTime, duration_millis: i64) -> Option<NaiveDateTime> {
        let whole_days = Duration::try_days(duration_millis / WORKDAY_MILLIS)?;
        let remainder = Duration::try_milliseconds(duration_millis % WORKDAY_MILLIS)?;

        let mut result = instant
            .checked_sub_signed(whole_days)?
            .checked_sub_signed(remainder)?;

        if result.hour() < WORKDAY_START_HOUR {
            result = result.checked_sub_signed(Duration::hours(OFF_HOURS))?;
        }
        if is_workday_end(&result) {
            result = result.checked_add_signed(Duration::hours(OFF_HOURS))?;
        }

        if self.weekends == WeekendPolicy::Skip {
            while is_weekend(&result) {
                result = result.checked_sub_signed(Duration::days(1))?;
            }
        }

        Some(result)
    }
}

/// True iff `before` strictly precedes `after`.
///
/// The backward pass uses this to tell whether an already recorded deadline
/// is tighter than a newly proposed one.
#[inline]
pub fn is_after(before: NaiveDateTime, after: NaiveDateTime) -> bool {
    before < after
}

fn is_workday_end(instant: &NaiveDateTime) -> bool {
    instant.num_seconds_from_midnight() == WORKDAY_END_HOUR * 3600 && instant.nanosecond() == 0
}

fn is_weekend(instant: &NaiveDateTime) -> bool {
    matches!(instant.weekday(), Weekday::Sat | Weekday::Sun)
}
