use chrono::prelude::*;
use chrono::Months;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::dates::{
    midnight, ndt_from_timestamp, timestamp_from_ndt, Timestamp, WeekdayOfMonth, DAY_IN_SECONDS,
    HOUR_IN_SECONDS, WEEK_IN_SECONDS,
};
use crate::errors::{DateKeeperError, Result};
use crate::validators::{
    ExpirationValidation, ExtendedPeriodState, PeriodState, ValidRange, ValidatorCore,
    ValidatorState, ValidatorType,
};

/// Parameters shared by every recurring validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PeriodParamsFields")]
pub struct PeriodParams {
    pub(crate) periods_in_future_enabled: u32,
    pub(crate) valid_hour: u32,
    pub(crate) valid_weekday: Weekday,
    pub(crate) period_interval_start: i64,
    pub(crate) period_interval_end: i64,
}

#[derive(Deserialize)]
struct PeriodParamsFields {
    periods_in_future_enabled: u32,
    valid_hour: u32,
    valid_weekday: Weekday,
    period_interval_start: i64,
    period_interval_end: i64,
}

impl TryFrom<PeriodParamsFields> for PeriodParams {
    type Error = DateKeeperError;

    fn try_from(fields: PeriodParamsFields) -> Result<Self> {
        PeriodParams::try_new(
            fields.periods_in_future_enabled,
            fields.valid_hour,
            fields.valid_weekday,
            fields.period_interval_start,
            fields.period_interval_end,
        )
    }
}

impl PeriodParams {
    /// Create parameters with an explicit expiration hour (UTC) and weekday.
    ///
    /// The trading window of an expiration `e` is `[e - period_interval_end, e - period_interval_start]`.
    pub fn try_new(
        periods_in_future_enabled: u32,
        valid_hour: u32,
        valid_weekday: Weekday,
        period_interval_start: i64,
        period_interval_end: i64,
    ) -> Result<Self> {
        if periods_in_future_enabled == 0 {
            return Err(DateKeeperError::invalid_parameter(
                "periods_in_future_enabled",
                "at least one period must be enabled",
            ));
        }
        if valid_hour > 23 {
            return Err(DateKeeperError::invalid_parameter(
                "valid_hour",
                format!("{} is not in [0, 23]", valid_hour),
            ));
        }
        if period_interval_start < 0 || period_interval_end < period_interval_start {
            return Err(DateKeeperError::invalid_parameter(
                "period_interval_start",
                format!(
                    "interval [{}, {}] must satisfy 0 <= start <= end",
                    period_interval_start, period_interval_end
                ),
            ));
        }
        Ok(PeriodParams {
            periods_in_future_enabled,
            valid_hour,
            valid_weekday,
            period_interval_start,
            period_interval_end,
        })
    }

    /// Create parameters taking the expiration hour and weekday from `initial_timestamp`.
    pub fn try_from_initial_timestamp(
        initial_timestamp: Timestamp,
        periods_in_future_enabled: u32,
        period_interval_start: i64,
        period_interval_end: i64,
    ) -> Result<Self> {
        let initial = ndt_from_timestamp(initial_timestamp)?;
        Self::try_new(
            periods_in_future_enabled,
            initial.hour(),
            initial.weekday(),
            period_interval_start,
            period_interval_end,
        )
    }

    pub fn periods_in_future_enabled(&self) -> u32 {
        self.periods_in_future_enabled
    }

    pub fn valid_hour(&self) -> u32 {
        self.valid_hour
    }

    pub fn valid_weekday(&self) -> Weekday {
        self.valid_weekday
    }

    pub fn period_interval_start(&self) -> i64 {
        self.period_interval_start
    }

    pub fn period_interval_end(&self) -> i64 {
        self.period_interval_end
    }
}

/// A rule generating one expiration instance per calendar period.
pub trait Recurrence: Debug + Clone + PartialEq {
    fn validator_type(&self) -> ValidatorType;

    /// Instances of the `periods_in_future_enabled` periods following `now`, ascending.
    ///
    /// The first period counted is the current one when its instance lies strictly after `now`,
    /// otherwise the next one. A period whose instance does not exist contributes nothing but
    /// still counts.
    fn upcoming(&self, params: &PeriodParams, now: Timestamp) -> Vec<Timestamp>;

    /// The weekday-of-month parameters, for month based recurrences.
    fn weekday_of_month(&self, params: &PeriodParams) -> Option<WeekdayOfMonth>;

    /// Weekday ordinal within the month and whether it counts from the month end.
    fn ordinal(&self) -> Option<(u32, bool)>;
}

/// Serialized form of [`Monthly`] and [`Quarterly`], checked on the way in.
#[derive(Deserialize)]
struct OrdinalFields {
    weekday_num_of_month: u32,
    weekday_from_end: bool,
}

/// Every week on the valid weekday at the valid hour.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weekly;

impl Recurrence for Weekly {
    fn validator_type(&self) -> ValidatorType {
        ValidatorType::Weekly
    }

    fn upcoming(&self, params: &PeriodParams, now: Timestamp) -> Vec<Timestamp> {
        let (Ok(day), Ok(date)) = (midnight(now), ndt_from_timestamp(now)) else {
            return vec![];
        };
        let shift = (params.valid_weekday.num_days_from_monday() as i64
            - date.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        let mut first = day + shift * DAY_IN_SECONDS + params.valid_hour as i64 * HOUR_IN_SECONDS;
        if first <= now {
            first += WEEK_IN_SECONDS;
        }
        (0..params.periods_in_future_enabled as i64)
            .map(|k| first + k * WEEK_IN_SECONDS)
            .collect()
    }

    fn weekday_of_month(&self, _params: &PeriodParams) -> Option<WeekdayOfMonth> {
        None
    }

    fn ordinal(&self) -> Option<(u32, bool)> {
        None
    }
}

/// The nth valid weekday of every month, counted from the start or the end of the month.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OrdinalFields")]
pub struct Monthly {
    pub(crate) weekday_num_of_month: u32,
    pub(crate) weekday_from_end: bool,
}

impl Monthly {
    pub fn try_new(weekday_num_of_month: u32, weekday_from_end: bool) -> Result<Self> {
        WeekdayOfMonth::try_new(weekday_num_of_month, Weekday::Mon, weekday_from_end)?;
        Ok(Monthly {
            weekday_num_of_month,
            weekday_from_end,
        })
    }
}

impl TryFrom<OrdinalFields> for Monthly {
    type Error = DateKeeperError;

    fn try_from(fields: OrdinalFields) -> Result<Self> {
        Monthly::try_new(fields.weekday_num_of_month, fields.weekday_from_end)
    }
}

impl Recurrence for Monthly {
    fn validator_type(&self) -> ValidatorType {
        ValidatorType::Monthly
    }

    fn upcoming(&self, params: &PeriodParams, now: Timestamp) -> Vec<Timestamp> {
        match self.weekday_of_month(params) {
            Some(anchor) => month_instances(&anchor, 1, params, now),
            None => vec![],
        }
    }

    fn weekday_of_month(&self, params: &PeriodParams) -> Option<WeekdayOfMonth> {
        WeekdayOfMonth::try_new(
            self.weekday_num_of_month,
            params.valid_weekday,
            self.weekday_from_end,
        )
        .ok()
    }

    fn ordinal(&self) -> Option<(u32, bool)> {
        Some((self.weekday_num_of_month, self.weekday_from_end))
    }
}

/// The nth valid weekday of every quarter-end month: March, June, September and December.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OrdinalFields")]
pub struct Quarterly {
    pub(crate) weekday_num_of_month: u32,
    pub(crate) weekday_from_end: bool,
}

impl Quarterly {
    pub fn try_new(weekday_num_of_month: u32, weekday_from_end: bool) -> Result<Self> {
        WeekdayOfMonth::try_new(weekday_num_of_month, Weekday::Mon, weekday_from_end)?;
        Ok(Quarterly {
            weekday_num_of_month,
            weekday_from_end,
        })
    }
}

impl TryFrom<OrdinalFields> for Quarterly {
    type Error = DateKeeperError;

    fn try_from(fields: OrdinalFields) -> Result<Self> {
        Quarterly::try_new(fields.weekday_num_of_month, fields.weekday_from_end)
    }
}

impl Recurrence for Quarterly {
    fn validator_type(&self) -> ValidatorType {
        ValidatorType::Quarterly
    }

    fn upcoming(&self, params: &PeriodParams, now: Timestamp) -> Vec<Timestamp> {
        match self.weekday_of_month(params) {
            Some(anchor) => month_instances(&anchor, 3, params, now),
            None => vec![],
        }
    }

    fn weekday_of_month(&self, params: &PeriodParams) -> Option<WeekdayOfMonth> {
        WeekdayOfMonth::try_new(
            self.weekday_num_of_month,
            params.valid_weekday,
            self.weekday_from_end,
        )
        .ok()
    }

    fn ordinal(&self) -> Option<(u32, bool)> {
        Some((self.weekday_num_of_month, self.weekday_from_end))
    }
}

/// Instances of a weekday-of-month rule stepping `step` months at a time, with periods aligned so
/// that their months are multiples of `step` (quarter ends when `step` is 3).
fn month_instances(
    anchor: &WeekdayOfMonth,
    step: u32,
    params: &PeriodParams,
    now: Timestamp,
) -> Vec<Timestamp> {
    let Ok(now_date) = ndt_from_timestamp(now) else {
        return vec![];
    };
    let aligned_month = now_date.month().div_ceil(step) * step;
    let Some(mut period) = NaiveDate::from_ymd_opt(now_date.year(), aligned_month, 1) else {
        return vec![];
    };
    let instance = |first_of_month: &NaiveDate| -> Option<Timestamp> {
        anchor
            .from_ym_opt(first_of_month.year(), first_of_month.month())
            .ok()
            .and_then(|d| d.and_hms_opt(params.valid_hour, 0, 0))
            .map(|dt| timestamp_from_ndt(&dt))
    };

    match instance(&period) {
        Some(ts) if ts > now => {}
        _ => match period.checked_add_months(Months::new(step)) {
            Some(next) => period = next,
            None => return vec![],
        },
    }

    let mut dates = Vec::with_capacity(params.periods_in_future_enabled as usize);
    for _ in 0..params.periods_in_future_enabled {
        if let Some(ts) = instance(&period) {
            dates.push(ts);
        }
        match period.checked_add_months(Months::new(step)) {
            Some(next) => period = next,
            None => break,
        }
    }
    dates
}

/// A validator accepting a bounded number of future instances of a recurring expiration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodValidator<R> {
    pub(crate) core: ValidatorCore,
    pub(crate) params: PeriodParams,
    pub(crate) recurrence: R,
}

pub type WeeklyValidator = PeriodValidator<Weekly>;
pub type MonthlyValidator = PeriodValidator<Monthly>;
pub type QuarterlyValidator = PeriodValidator<Quarterly>;

impl<R: Recurrence> PeriodValidator<R> {
    pub fn new(core: ValidatorCore, params: PeriodParams, recurrence: R) -> Self {
        PeriodValidator {
            core,
            params,
            recurrence,
        }
    }

    pub fn params(&self) -> &PeriodParams {
        &self.params
    }

    pub fn recurrence(&self) -> &R {
        &self.recurrence
    }

    fn period_state(&self) -> PeriodState {
        PeriodState {
            deployment_timestamp: self.core.deployment_timestamp,
            min_interval_since_deployment: self.core.min_interval_since_deployment,
            deal_date_granularity: self.core.deal_date_granularity,
            periods_in_future_enabled: self.params.periods_in_future_enabled,
            valid_hour: self.params.valid_hour,
            valid_weekday: self.params.valid_weekday.number_from_monday(),
            period_interval_start: self.params.period_interval_start,
            period_interval_end: self.params.period_interval_end,
        }
    }

    fn extended_state(&self, weekday_num_of_month: u32, weekday_from_end: bool) -> ExtendedPeriodState {
        ExtendedPeriodState {
            period: self.period_state(),
            weekday_num_of_month,
            weekday_from_end,
        }
    }
}

impl WeeklyValidator {
    /// Create a weekly validator deployed at `core.deployment_timestamp()`.
    pub fn weekly(core: ValidatorCore, params: PeriodParams) -> Self {
        PeriodValidator::new(core, params, Weekly)
    }
}

impl MonthlyValidator {
    /// Create a monthly validator.
    pub fn monthly(
        core: ValidatorCore,
        params: PeriodParams,
        weekday_num_of_month: u32,
        weekday_from_end: bool,
    ) -> Result<Self> {
        Ok(PeriodValidator::new(
            core,
            params,
            Monthly::try_new(weekday_num_of_month, weekday_from_end)?,
        ))
    }
}

impl QuarterlyValidator {
    /// Create a quarterly validator.
    pub fn quarterly(
        core: ValidatorCore,
        params: PeriodParams,
        weekday_num_of_month: u32,
        weekday_from_end: bool,
    ) -> Result<Self> {
        Ok(PeriodValidator::new(
            core,
            params,
            Quarterly::try_new(weekday_num_of_month, weekday_from_end)?,
        ))
    }
}

impl<R: Recurrence> ExpirationValidation for PeriodValidator<R> {
    fn core(&self) -> &ValidatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ValidatorCore {
        &mut self.core
    }

    fn validator_type(&self) -> ValidatorType {
        self.recurrence.validator_type()
    }

    fn is_expiration_instance(&self, now: Timestamp, candidate: Timestamp) -> bool {
        self.recurrence
            .upcoming(&self.params, now)
            .binary_search(&candidate)
            .is_ok()
    }

    fn get_valid_range(&self, expiration_date: Timestamp) -> Option<ValidRange> {
        Some(ValidRange {
            start: expiration_date.checked_sub(self.params.period_interval_end)?,
            end: expiration_date.checked_sub(self.params.period_interval_start)?,
            modulo: self.core.deal_date_granularity,
        })
    }

    fn expiration_dates(&self, now: Timestamp) -> Vec<Timestamp> {
        self.recurrence
            .upcoming(&self.params, now)
            .into_iter()
            .filter(|d| self.core.is_above_floor(*d))
            .collect()
    }

    fn get_validator_state(&self) -> ValidatorState {
        match (self.recurrence.validator_type(), self.recurrence.ordinal()) {
            (ValidatorType::Monthly, Some((n, from_end))) => {
                ValidatorState::Monthly(self.extended_state(n, from_end))
            }
            (ValidatorType::Quarterly, Some((n, from_end))) => {
                ValidatorState::Quarterly(self.extended_state(n, from_end))
            }
            _ => ValidatorState::Weekly(self.period_state()),
        }
    }
}
