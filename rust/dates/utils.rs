use chrono::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{DateKeeperError, Result};

/// Seconds since the Unix epoch, UTC.
pub type Timestamp = i64;

pub const MINUTE_IN_SECONDS: i64 = 60;
pub const HOUR_IN_SECONDS: i64 = 60 * MINUTE_IN_SECONDS;
pub const DAY_IN_SECONDS: i64 = 24 * HOUR_IN_SECONDS;
pub const WEEK_IN_SECONDS: i64 = 7 * DAY_IN_SECONDS;

/// Earliest year accepted by the date validity checks.
pub const EPOCH_YEAR: i32 = 1970;

/// A civil UTC date-time broken into its components.
///
/// `weekday` follows ISO numbering: 1 = Monday, .., 7 = Sunday.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTimeParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub weekday: u32,
}

/// Gregorian leap year rule.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in the given month of the given year.
pub fn days_in_month(year: i32, month: u32) -> Result<u32> {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => Ok(31),
        4 | 6 | 9 | 11 => Ok(30),
        2 if is_leap_year(year) => Ok(29),
        2 => Ok(28),
        _ => Err(DateKeeperError::invalid_date(format!(
            "month {} is not in [1, 12]",
            month
        ))),
    }
}

/// Returns whether `(year, month, day)` is a calendar date on or after 1970-01-01.
pub fn is_valid_date(year: i32, month: u32, day: u32) -> bool {
    if year < EPOCH_YEAR {
        return false;
    }
    match days_in_month(year, month) {
        Ok(dim) => day >= 1 && day <= dim,
        Err(_) => false,
    }
}

/// Returns whether the date is valid and the time of day lies in `[00:00:00, 23:59:59]`.
pub fn is_valid_date_time(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> bool {
    is_valid_date(year, month, day) && hour < 24 && minute < 60 && second < 60
}

/// Convert a non-negative timestamp into a `NaiveDateTime` in UTC.
pub fn ndt_from_timestamp(timestamp: Timestamp) -> Result<NaiveDateTime> {
    if timestamp < 0 {
        return Err(DateKeeperError::invalid_date(format!(
            "timestamp {} precedes the Unix epoch",
            timestamp
        )));
    }
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| {
            DateKeeperError::invalid_date(format!("timestamp {} is out of range", timestamp))
        })
}

/// Convert a UTC `NaiveDateTime` into a timestamp.
pub fn timestamp_from_ndt(date: &NaiveDateTime) -> Timestamp {
    date.and_utc().timestamp()
}

/// Break a timestamp into its civil UTC components.
pub fn timestamp_to_date_time(timestamp: Timestamp) -> Result<DateTimeParts> {
    let dt = ndt_from_timestamp(timestamp)?;
    Ok(DateTimeParts {
        year: dt.year(),
        month: dt.month(),
        day: dt.day(),
        hour: dt.hour(),
        minute: dt.minute(),
        second: dt.second(),
        weekday: dt.weekday().number_from_monday(),
    })
}

/// Assemble a timestamp from civil UTC components.
pub fn timestamp_from_date_time(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Result<Timestamp> {
    if !is_valid_date_time(year, month, day, hour, minute, second) {
        return Err(DateKeeperError::invalid_date(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02} is not a valid date-time",
            year, month, day, hour, minute, second
        )));
    }
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .map(|dt| timestamp_from_ndt(&dt))
        .ok_or_else(|| DateKeeperError::invalid_date("date-time out of range"))
}

/// Number of days in the month containing `timestamp`.
pub fn days_in_month_of(timestamp: Timestamp) -> Result<u32> {
    let dt = ndt_from_timestamp(timestamp)?;
    days_in_month(dt.year(), dt.month())
}

/// ISO weekday of `timestamp`, 1 = Monday .. 7 = Sunday.
///
/// Equivalent to `(days_since_epoch + 3) mod 7 + 1`, since 1970-01-01 was a Thursday.
pub fn iso_weekday(timestamp: Timestamp) -> Result<u32> {
    Ok(ndt_from_timestamp(timestamp)?.weekday().number_from_monday())
}

/// Timestamp of 00:00:00 UTC on the day containing `timestamp`.
pub fn midnight(timestamp: Timestamp) -> Result<Timestamp> {
    if timestamp < 0 {
        return Err(DateKeeperError::invalid_date(format!(
            "timestamp {} precedes the Unix epoch",
            timestamp
        )));
    }
    Ok(timestamp - timestamp % DAY_IN_SECONDS)
}

/// Parse an ISO weekday number into a chrono `Weekday`.
pub fn weekday_from_iso(weekday: u32) -> Result<Weekday> {
    match weekday {
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        7 => Ok(Weekday::Sun),
        _ => Err(DateKeeperError::invalid_date(format!(
            "weekday {} is not in [1, 7]",
            weekday
        ))),
    }
}
