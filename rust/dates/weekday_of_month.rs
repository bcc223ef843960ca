use chrono::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dates::utils::{
    days_in_month, ndt_from_timestamp, timestamp_from_ndt, weekday_from_iso, Timestamp,
};
use crate::errors::{DateKeeperError, Result};

/// Largest ordinal of a weekday within any month.
pub const MAX_WEEKDAY_NUM_OF_MONTH: u32 = 5;

/// Specifier for the *n*th occurrence of a weekday within a calendar month, counted either from
/// the first or from the last day of the month.
///
/// For example `{ n: 1, weekday: Fri, from_end: true }` is the last Friday of the month and
/// `{ n: 3, weekday: Wed, from_end: false }` is the third Wednesday.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekdayOfMonth {
    pub(crate) n: u32,
    pub(crate) weekday: Weekday,
    pub(crate) from_end: bool,
}

impl WeekdayOfMonth {
    /// Create a specifier. `n` must lie in `[1, 5]`.
    pub fn try_new(n: u32, weekday: Weekday, from_end: bool) -> Result<Self> {
        if n == 0 || n > MAX_WEEKDAY_NUM_OF_MONTH {
            return Err(DateKeeperError::invalid_parameter(
                "weekday_num_of_month",
                format!("{} is not in [1, {}]", n, MAX_WEEKDAY_NUM_OF_MONTH),
            ));
        }
        Ok(WeekdayOfMonth {
            n,
            weekday,
            from_end,
        })
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    pub fn from_end(&self) -> bool {
        self.from_end
    }

    /// Get the date matching the definition in the given month and year.
    ///
    /// Errors if the ordinal does not exist in that month, e.g. a 5th Monday of a month with
    /// only four Mondays. No clamping is applied.
    pub fn from_ym_opt(&self, year: i32, month: u32) -> Result<NaiveDate> {
        let dim = days_in_month(year, month)?;
        let target = self.weekday.num_days_from_monday() as i64;
        let day: i64 = if self.from_end {
            let last = NaiveDate::from_ymd_opt(year, month, dim)
                .ok_or_else(|| DateKeeperError::invalid_date("`year` out of range"))?;
            let back = (last.weekday().num_days_from_monday() as i64 - target).rem_euclid(7);
            dim as i64 - back - 7 * (self.n as i64 - 1)
        } else {
            let first = NaiveDate::from_ymd_opt(year, month, 1)
                .ok_or_else(|| DateKeeperError::invalid_date("`year` out of range"))?;
            let forward = (target - first.weekday().num_days_from_monday() as i64).rem_euclid(7);
            1 + forward + 7 * (self.n as i64 - 1)
        };
        if day < 1 || day > dim as i64 {
            return Err(DateKeeperError::invalid_date(format!(
                "{:04}-{:02} has no {} {:?} counted from the {}",
                year,
                month,
                ordinal(self.n),
                self.weekday,
                if self.from_end { "end" } else { "start" }
            )));
        }
        NaiveDate::from_ymd_opt(year, month, day as u32)
            .ok_or_else(|| DateKeeperError::invalid_date("`year` out of range"))
    }

    /// Check whether a given date aligns with the definition.
    pub fn validate(&self, date: &NaiveDate) -> bool {
        match self.from_ym_opt(date.year(), date.month()) {
            Ok(val) => *date == val,
            Err(_) => false,
        }
    }
}

fn ordinal(n: u32) -> String {
    match n {
        1 => "1st".to_string(),
        2 => "2nd".to_string(),
        3 => "3rd".to_string(),
        _ => format!("{}th", n),
    }
}

/// Find the midnight UTC timestamp of the `weekday_num_of_month`th `weekday` (ISO numbering) in
/// the month of `reference`, counting from the start of the month, or from its end when
/// `from_end` is set.
///
/// Fails with `InvalidDate` if that occurrence does not exist in the month.
pub fn get_weekday_of_the_month(
    reference: Timestamp,
    weekday_num_of_month: u32,
    weekday: u32,
    from_end: bool,
) -> Result<Timestamp> {
    let anchor = WeekdayOfMonth::try_new(weekday_num_of_month, weekday_from_iso(weekday)?, from_end)
        .map_err(|e| DateKeeperError::invalid_date(e.to_string()))?;
    let dt = ndt_from_timestamp(reference)?;
    let date = anchor.from_ym_opt(dt.year(), dt.month())?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| timestamp_from_ndt(&dt))
        .ok_or_else(|| DateKeeperError::invalid_date("midnight out of range"))
}
