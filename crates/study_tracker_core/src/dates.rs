//! crates/study_tracker_core/src/dates.rs
//!
//! Calendar helpers shared by the views. All calendar comparisons are done in
//! UTC and the current instant is always passed in.

use chrono::{DateTime, Days, NaiveDate, Utc};

/// `"Mon, Jan 8"`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%a, %b %-d").to_string()
}

/// `"09:05 AM"`.
pub fn format_time(ts: DateTime<Utc>) -> String {
    ts.format("%I:%M %p").to_string()
}

/// Locale-independent grouping key, `YYYY-MM-DD`.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn is_today(date: NaiveDate, now: DateTime<Utc>) -> bool {
    date == now.date_naive()
}

pub fn is_tomorrow(date: NaiveDate, now: DateTime<Utc>) -> bool {
    now.date_naive()
        .checked_add_days(Days::new(1))
        .is_some_and(|tomorrow| tomorrow == date)
}

pub fn is_past(ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    ts < now
}

/// `"Today"`, `"Tomorrow"`, or the formatted date.
pub fn relative_day_description(date: NaiveDate, now: DateTime<Utc>) -> String {
    if is_today(date, now) {
        "Today".to_string()
    } else if is_tomorrow(date, now) {
        "Tomorrow".to_string()
    } else {
        format_date(date)
    }
}
