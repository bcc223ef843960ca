//! Calendar arithmetic on Unix timestamps.
//!
//! All timestamps are whole seconds since 1970-01-01 00:00:00 UTC and every date is interpreted
//! in UTC. Weekdays are numbered the ISO way, 1 = Monday .. 7 = Sunday, so the epoch itself is a
//! Thursday (4).
//!
//! ### Example
//! Find the last Friday of August 2019 from any instant within that month.
//! ```rust
//! # use datekeeper::dates::{get_weekday_of_the_month, timestamp_to_date_time};
//! let ts = get_weekday_of_the_month(1567024282, 1, 5, true).unwrap();
//! let parts = timestamp_to_date_time(ts).unwrap();
//! assert_eq!((parts.year, parts.month, parts.day, parts.weekday), (2019, 8, 30, 5));
//! ```

mod utils;
mod weekday_of_month;

pub use crate::dates::{
    utils::{
        days_in_month, days_in_month_of, is_leap_year, is_valid_date, is_valid_date_time,
        iso_weekday, midnight, ndt_from_timestamp, timestamp_from_date_time, timestamp_from_ndt,
        timestamp_to_date_time, weekday_from_iso, DateTimeParts, Timestamp, DAY_IN_SECONDS,
        EPOCH_YEAR, HOUR_IN_SECONDS, MINUTE_IN_SECONDS, WEEK_IN_SECONDS,
    },
    weekday_of_month::{get_weekday_of_the_month, WeekdayOfMonth, MAX_WEEKDAY_NUM_OF_MONTH},
};
