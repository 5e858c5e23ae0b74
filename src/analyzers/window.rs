//! Trailing time windows used to bucket revenue and order counts.

use chrono::{
    DateTime, Datelike, Days, Duration, LocalResult, NaiveDate, NaiveTime, Offset, TimeZone, Utc,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Today,
    Week,
    Month,
}

/// Inclusive lower bounds of the three windows, resolved to UTC.
///
/// All three are local midnights in the zone of the `now` they were built
/// from, so `month_start <= week_start <= day_start` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowBounds {
    pub day_start: DateTime<Utc>,
    pub week_start: DateTime<Utc>,
    pub month_start: DateTime<Utc>,
}

impl WindowBounds {
    pub fn from_now<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();

        let week = today.checked_sub_days(Days::new(7)).unwrap_or(NaiveDate::MIN);
        let month = month_back(today);

        WindowBounds {
            day_start: local_midnight(&tz, today),
            week_start: local_midnight(&tz, week),
            month_start: local_midnight(&tz, month),
        }
    }

    pub fn start(&self, window: Window) -> DateTime<Utc> {
        match window {
            Window::Today => self.day_start,
            Window::Week => self.week_start,
            Window::Month => self.month_start,
        }
    }

    /// An order without a timestamp belongs to no window.
    pub fn contains(&self, window: Window, at: Option<DateTime<Utc>>) -> bool {
        at.is_some_and(|t| t >= self.start(window))
    }
}

/// Steps a date back one calendar month keeping its day-of-month. Days past
/// the end of the previous month spill forward into the following one, so
/// Mar 31 becomes Mar 3 (Mar 2 in a leap year).
pub fn month_back(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.checked_add_days(Days::new(u64::from(date.day() - 1))))
        .unwrap_or(NaiveDate::MIN)
}

/// Midnight of `date` in `tz`, taking the earlier instant when midnight
/// repeats. A midnight skipped by a DST transition is read with the offset
/// in force just before the gap, which lands on the first instant of the day.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let before = tz
                .offset_from_utc_datetime(&(midnight - Duration::hours(24)))
                .fix();
            let utc = midnight - Duration::seconds(i64::from(before.local_minus_utc()));
            Utc.from_utc_datetime(&utc)
        }
    }
}
