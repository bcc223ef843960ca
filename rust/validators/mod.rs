//! Expiration date validators.
//!
//! A validator decides whether a timestamp is an acceptable expiration date and, for an accepted
//! date, which last-deal-dates may accompany it. Four kinds exist:
//!
//! - [`WeeklyValidator`]: a fixed weekday and hour, a bounded number of weeks ahead.
//! - [`MonthlyValidator`]: the *n*th weekday of the month, counted from its start or end.
//! - [`QuarterlyValidator`]: as monthly, but only in the quarter-end months.
//! - [`FixedValidator`]: an explicit ascending ledger of dates with per-date trading windows.
//!
//! All of them implement [`ExpirationValidation`] and are collected in the [`Validator`] enum.
//!
//! ### Example
//! ```rust
//! # use datekeeper::validators::{ExpirationValidation, PeriodParams, ValidatorCore, WeeklyValidator};
//! # use datekeeper::dates::{timestamp_from_date_time, DAY_IN_SECONDS};
//! # use chrono::Weekday;
//! let core = ValidatorCore::try_new(timestamp_from_date_time(2024, 1, 1, 0, 0, 0).unwrap(), 0, None).unwrap();
//! let params = PeriodParams::try_new(4, 8, Weekday::Fri, DAY_IN_SECONDS, 3 * DAY_IN_SECONDS).unwrap();
//! let weekly = WeeklyValidator::weekly(core, params);
//! let now = timestamp_from_date_time(2024, 10, 16, 12, 0, 0).unwrap();
//! let friday = timestamp_from_date_time(2024, 10, 18, 8, 0, 0).unwrap();
//! assert!(weekly.validate_expiration_date(now, friday));
//! assert!(weekly.validate(now, friday, &[friday - 3 * DAY_IN_SECONDS, friday - DAY_IN_SECONDS]));
//! ```

mod base;
mod fixed;
mod period;
mod serde;
mod state;

pub use crate::validators::{
    base::{ValidatorCore, ValidatorEvent},
    fixed::{zip_fixed_dates, DateBatch, FixedDate, FixedValidator},
    period::{
        Monthly, MonthlyValidator, PeriodParams, PeriodValidator, Quarterly, QuarterlyValidator,
        Recurrence, Weekly, WeeklyValidator,
    },
    state::{
        ExtendedPeriodState, FixedState, PeriodState, ValidatorState, VersionedState,
        STATE_VERSION,
    },
};

use ::serde::{Deserialize, Serialize};
use std::fmt;

use crate::access::CallContext;
use crate::dates::Timestamp;
use crate::errors::Result;

/// Kind tag of a validator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidatorType {
    Weekly = 0,
    Monthly = 1,
    Quarterly = 2,
    Fixed = 3,
}

impl fmt::Display for ValidatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorType::Weekly => write!(f, "weekly"),
            ValidatorType::Monthly => write!(f, "monthly"),
            ValidatorType::Quarterly => write!(f, "quarterly"),
            ValidatorType::Fixed => write!(f, "fixed"),
        }
    }
}

/// Trading window of an expiration date.
///
/// A last-deal-date `d` is admitted if `start <= d <= end` and `(d - start)` is a multiple of
/// `modulo`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidRange {
    pub start: Timestamp,
    pub end: Timestamp,
    pub modulo: i64,
}

impl ValidRange {
    pub fn contains(&self, last_deal_date: Timestamp) -> bool {
        self.start <= last_deal_date
            && last_deal_date <= self.end
            && self.modulo > 0
            && (last_deal_date - self.start) % self.modulo == 0
    }
}

/// Capability shared by every validator kind.
pub trait ExpirationValidation {
    fn core(&self) -> &ValidatorCore;

    fn core_mut(&mut self) -> &mut ValidatorCore;

    fn validator_type(&self) -> ValidatorType;

    /// Returns whether `candidate` is one of the validator's expiration instances at time `now`,
    /// ignoring the deployment floor.
    fn is_expiration_instance(&self, now: Timestamp, candidate: Timestamp) -> bool;

    /// Trading window of `expiration_date`, or `None` if the validator has no window for it.
    fn get_valid_range(&self, expiration_date: Timestamp) -> Option<ValidRange>;

    /// Every expiration date accepted at time `now`, ascending.
    fn expiration_dates(&self, now: Timestamp) -> Vec<Timestamp>;

    fn get_validator_state(&self) -> ValidatorState;

    /// Returns whether `candidate` is an acceptable expiration date at time `now`.
    fn validate_expiration_date(&self, now: Timestamp, candidate: Timestamp) -> bool {
        self.core().is_above_floor(candidate) && self.is_expiration_instance(now, candidate)
    }

    /// Returns whether every date of `last_deal_dates` lies in the trading window of
    /// `expiration_date`.
    fn validate_last_deal_dates(
        &self,
        expiration_date: Timestamp,
        last_deal_dates: &[Timestamp],
    ) -> bool {
        match self.get_valid_range(expiration_date) {
            Some(range) => last_deal_dates.iter().all(|d| range.contains(*d)),
            None => false,
        }
    }

    /// Validate an expiration date together with its last-deal-dates.
    fn validate(
        &self,
        now: Timestamp,
        expiration_date: Timestamp,
        last_deal_dates: &[Timestamp],
    ) -> bool {
        self.validate_expiration_date(now, expiration_date)
            && self.validate_last_deal_dates(expiration_date, last_deal_dates)
    }

    /// Replace the minimum interval since deployment. Governor only.
    fn set_min_interval_since_deployment(
        &mut self,
        ctx: &CallContext,
        value: i64,
    ) -> Result<ValidatorEvent> {
        self.core_mut().set_min_interval_since_deployment(ctx, value)
    }

    /// The versioned binary snapshot of the validator's configuration.
    fn encoded_state(&self) -> Result<Vec<u8>> {
        VersionedState::new(self.get_validator_state()).encode()
    }
}

/// Container for any validator kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Validator {
    Weekly(WeeklyValidator),
    Monthly(MonthlyValidator),
    Quarterly(QuarterlyValidator),
    Fixed(FixedValidator),
}

impl From<WeeklyValidator> for Validator {
    fn from(item: WeeklyValidator) -> Self {
        Validator::Weekly(item)
    }
}

impl From<MonthlyValidator> for Validator {
    fn from(item: MonthlyValidator) -> Self {
        Validator::Monthly(item)
    }
}

impl From<QuarterlyValidator> for Validator {
    fn from(item: QuarterlyValidator) -> Self {
        Validator::Quarterly(item)
    }
}

impl From<FixedValidator> for Validator {
    fn from(item: FixedValidator) -> Self {
        Validator::Fixed(item)
    }
}

impl Validator {
    pub fn as_fixed(&self) -> Option<&FixedValidator> {
        match self {
            Validator::Fixed(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_fixed_mut(&mut self) -> Option<&mut FixedValidator> {
        match self {
            Validator::Fixed(v) => Some(v),
            _ => None,
        }
    }
}

impl ExpirationValidation for Validator {
    fn core(&self) -> &ValidatorCore {
        match self {
            Validator::Weekly(v) => v.core(),
            Validator::Monthly(v) => v.core(),
            Validator::Quarterly(v) => v.core(),
            Validator::Fixed(v) => v.core(),
        }
    }

    fn core_mut(&mut self) -> &mut ValidatorCore {
        match self {
            Validator::Weekly(v) => v.core_mut(),
            Validator::Monthly(v) => v.core_mut(),
            Validator::Quarterly(v) => v.core_mut(),
            Validator::Fixed(v) => v.core_mut(),
        }
    }

    fn validator_type(&self) -> ValidatorType {
        match self {
            Validator::Weekly(v) => v.validator_type(),
            Validator::Monthly(v) => v.validator_type(),
            Validator::Quarterly(v) => v.validator_type(),
            Validator::Fixed(v) => v.validator_type(),
        }
    }

    fn is_expiration_instance(&self, now: Timestamp, candidate: Timestamp) -> bool {
        match self {
            Validator::Weekly(v) => v.is_expiration_instance(now, candidate),
            Validator::Monthly(v) => v.is_expiration_instance(now, candidate),
            Validator::Quarterly(v) => v.is_expiration_instance(now, candidate),
            Validator::Fixed(v) => v.is_expiration_instance(now, candidate),
        }
    }

    fn get_valid_range(&self, expiration_date: Timestamp) -> Option<ValidRange> {
        match self {
            Validator::Weekly(v) => v.get_valid_range(expiration_date),
            Validator::Monthly(v) => v.get_valid_range(expiration_date),
            Validator::Quarterly(v) => v.get_valid_range(expiration_date),
            Validator::Fixed(v) => v.get_valid_range(expiration_date),
        }
    }

    fn expiration_dates(&self, now: Timestamp) -> Vec<Timestamp> {
        match self {
            Validator::Weekly(v) => v.expiration_dates(now),
            Validator::Monthly(v) => v.expiration_dates(now),
            Validator::Quarterly(v) => v.expiration_dates(now),
            Validator::Fixed(v) => v.expiration_dates(now),
        }
    }

    fn get_validator_state(&self) -> ValidatorState {
        match self {
            Validator::Weekly(v) => v.get_validator_state(),
            Validator::Monthly(v) => v.get_validator_state(),
            Validator::Quarterly(v) => v.get_validator_state(),
            Validator::Fixed(v) => v.get_validator_state(),
        }
    }
}

// UNIT TESTS
#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::DAY_IN_SECONDS;

    #[test]
    fn test_valid_range_modulo_rule() {
        let range = ValidRange {
            start: 1_000_000,
            end: 1_000_000 + 3 * DAY_IN_SECONDS,
            modulo: DAY_IN_SECONDS,
        };
        let options: Vec<(Timestamp, bool)> = vec![
            (range.start, true),
            (range.end, true),
            (range.start + DAY_IN_SECONDS, true),
            (range.start + 2 * DAY_IN_SECONDS, true),
            (range.start + 1, false),
            (range.end - 1, false),
            (range.start - DAY_IN_SECONDS, false),
            (range.end + DAY_IN_SECONDS, false),
        ];
        for (ldd, expected) in options {
            assert_eq!(range.contains(ldd), expected, "{}", ldd);
        }
    }

    #[test]
    fn test_enum_dispatch() {
        let core = ValidatorCore::try_new(0, 0, None).unwrap();
        let fixed = FixedValidator::try_from_parts(
            core,
            &[10 * DAY_IN_SECONDS],
            &[0],
            &[2 * DAY_IN_SECONDS],
        )
        .unwrap();
        let v: Validator = fixed.clone().into();
        assert_eq!(v.validator_type(), ValidatorType::Fixed);
        assert_eq!(v.get_validator_state(), fixed.get_validator_state());
        assert!(v.validate(0, 10 * DAY_IN_SECONDS, &[8 * DAY_IN_SECONDS, 10 * DAY_IN_SECONDS]));
        assert!(!v.validate(0, 10 * DAY_IN_SECONDS, &[9 * DAY_IN_SECONDS + 1]));
        assert!(!v.validate(0, 11 * DAY_IN_SECONDS, &[]));
        assert!(v.as_fixed().is_some());
        let decoded = VersionedState::decode(&v.encoded_state().unwrap()).unwrap();
        assert_eq!(decoded.state, fixed.get_validator_state());
    }

    #[test]
    fn test_validator_type_display() {
        assert_eq!(ValidatorType::Quarterly.to_string(), "quarterly");
        assert_eq!(ValidatorType::Fixed as u8, 3);
    }
}
