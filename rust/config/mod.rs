//! Deploy-time configuration of a [`DateKeeper`].
//!
//! A [`DateKeeperConfig`] lists validators in priority order. It is plain serde data, usually
//! loaded from JSON, and [`DateKeeperConfig::build`] turns it into a keeper whose validators
//! are all deployed at the call's timestamp.
//!
//! ### Example
//! ```rust
//! # use datekeeper::access::{Address, CallContext, RoleManager};
//! # use datekeeper::config::DateKeeperConfig;
//! # use datekeeper::json::JSON;
//! let json = r#"{"validators": [
//!     {"address": "0x0000000000000000000000000000000000000064",
//!      "validator": {"Weekly": {
//!         "initial_timestamp": 1546588800,
//!         "periods_in_future_enabled": 4,
//!         "min_interval_since_deployment": 0,
//!         "period_interval_start": 86400,
//!         "period_interval_end": 259200}}}
//! ]}"#;
//! let config = DateKeeperConfig::from_json(json).unwrap();
//! let roles = RoleManager::new(vec![Address::from(1)]);
//! let ctx = CallContext::new(Address::from(1), 1_700_000_000, &roles);
//! let keeper = config.build(&ctx).unwrap();
//! assert_eq!(keeper.validator_count(), 1);
//! ```

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::access::{Address, CallContext};
use crate::dates::Timestamp;
use crate::errors::Result;
use crate::json::JSON;
use crate::keeper::DateKeeper;
use crate::validators::{
    FixedValidator, MonthlyValidator, PeriodParams, QuarterlyValidator, Validator, ValidatorCore,
    WeeklyValidator,
};

/// Parameters of a weekly validator.
///
/// The expiration hour and weekday are those of `initial_timestamp`, in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodConfig {
    pub initial_timestamp: Timestamp,
    pub periods_in_future_enabled: u32,
    pub min_interval_since_deployment: i64,
    pub period_interval_start: i64,
    pub period_interval_end: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_date_granularity: Option<i64>,
}

/// Parameters of a monthly or quarterly validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyConfig {
    #[serde(flatten)]
    pub period: PeriodConfig,
    pub weekday_num_of_month: u32,
    pub weekday_from_end: bool,
}

/// Initial ledger of a fixed-date validator. The three vectors are index aligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedConfig {
    pub min_interval_since_deployment: i64,
    pub dates: Vec<Timestamp>,
    pub interval_starts: Vec<i64>,
    pub interval_ends: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_date_granularity: Option<i64>,
}

/// Kind and parameters of one validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidatorConfig {
    Weekly(PeriodConfig),
    Monthly(MonthlyConfig),
    Quarterly(MonthlyConfig),
    Fixed(FixedConfig),
}

/// A validator and the address it is registered under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorEntry {
    pub address: Address,
    pub validator: ValidatorConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateKeeperConfig {
    pub validators: Vec<ValidatorEntry>,
}

impl PeriodConfig {
    fn core(&self, deployment_timestamp: Timestamp) -> Result<ValidatorCore> {
        ValidatorCore::try_new(
            deployment_timestamp,
            self.min_interval_since_deployment,
            self.deal_date_granularity,
        )
    }

    fn params(&self) -> Result<PeriodParams> {
        PeriodParams::try_from_initial_timestamp(
            self.initial_timestamp,
            self.periods_in_future_enabled,
            self.period_interval_start,
            self.period_interval_end,
        )
    }
}

impl ValidatorConfig {
    /// Construct the validator as deployed at `deployment_timestamp`.
    pub fn build(&self, deployment_timestamp: Timestamp) -> Result<Validator> {
        let validator: Validator = match self {
            ValidatorConfig::Weekly(c) => {
                WeeklyValidator::weekly(c.core(deployment_timestamp)?, c.params()?).into()
            }
            ValidatorConfig::Monthly(c) => MonthlyValidator::monthly(
                c.period.core(deployment_timestamp)?,
                c.period.params()?,
                c.weekday_num_of_month,
                c.weekday_from_end,
            )?
            .into(),
            ValidatorConfig::Quarterly(c) => QuarterlyValidator::quarterly(
                c.period.core(deployment_timestamp)?,
                c.period.params()?,
                c.weekday_num_of_month,
                c.weekday_from_end,
            )?
            .into(),
            ValidatorConfig::Fixed(c) => FixedValidator::try_from_parts(
                ValidatorCore::try_new(
                    deployment_timestamp,
                    c.min_interval_since_deployment,
                    c.deal_date_granularity,
                )?,
                &c.dates,
                &c.interval_starts,
                &c.interval_ends,
            )?
            .into(),
        };
        Ok(validator)
    }
}

impl DateKeeperConfig {
    /// Deploy every validator at `ctx.now` and register them in order.
    pub fn build(&self, ctx: &CallContext) -> Result<DateKeeper> {
        let validators = self
            .validators
            .iter()
            .map(|entry| Ok((entry.address, entry.validator.build(ctx.now)?)))
            .collect::<Result<Vec<_>>>()?;
        info!(
            caller = %ctx.caller,
            deployment_timestamp = ctx.now,
            count = validators.len(),
            "deploying date keeper"
        );
        DateKeeper::try_new(validators)
    }
}

impl JSON for PeriodConfig {}
impl JSON for MonthlyConfig {}
impl JSON for FixedConfig {}
impl JSON for ValidatorConfig {}
impl JSON for DateKeeperConfig {}
