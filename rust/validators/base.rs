use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::access::{CallContext, Role};
use crate::dates::{Timestamp, DAY_IN_SECONDS};
use crate::errors::{DateKeeperError, Result};

/// State common to every validator kind.
///
/// A validator never accepts an expiration earlier than
/// `deployment_timestamp + min_interval_since_deployment`. The deployment timestamp is fixed at
/// construction; the interval may be changed later by a governor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ValidatorCoreFields")]
pub struct ValidatorCore {
    pub(crate) deployment_timestamp: Timestamp,
    pub(crate) min_interval_since_deployment: i64,
    pub(crate) deal_date_granularity: i64,
}

#[derive(Deserialize)]
struct ValidatorCoreFields {
    deployment_timestamp: Timestamp,
    min_interval_since_deployment: i64,
    deal_date_granularity: i64,
}

impl TryFrom<ValidatorCoreFields> for ValidatorCore {
    type Error = DateKeeperError;

    fn try_from(fields: ValidatorCoreFields) -> Result<Self> {
        ValidatorCore::try_new(
            fields.deployment_timestamp,
            fields.min_interval_since_deployment,
            Some(fields.deal_date_granularity),
        )
    }
}

impl ValidatorCore {
    /// Create the common state for a validator deployed at `deployment_timestamp`.
    ///
    /// `deal_date_granularity` is the modulo applied to last-deal-dates, one day if `None`.
    pub fn try_new(
        deployment_timestamp: Timestamp,
        min_interval_since_deployment: i64,
        deal_date_granularity: Option<i64>,
    ) -> Result<Self> {
        if deployment_timestamp < 0 {
            return Err(DateKeeperError::invalid_parameter(
                "deployment_timestamp",
                "must not precede the Unix epoch",
            ));
        }
        if min_interval_since_deployment < 0 {
            return Err(DateKeeperError::invalid_parameter(
                "min_interval_since_deployment",
                "must not be negative",
            ));
        }
        let granularity = deal_date_granularity.unwrap_or(DAY_IN_SECONDS);
        if granularity <= 0 {
            return Err(DateKeeperError::invalid_parameter(
                "deal_date_granularity",
                "must be positive",
            ));
        }
        Ok(ValidatorCore {
            deployment_timestamp,
            min_interval_since_deployment,
            deal_date_granularity: granularity,
        })
    }

    pub fn deployment_timestamp(&self) -> Timestamp {
        self.deployment_timestamp
    }

    pub fn min_interval_since_deployment(&self) -> i64 {
        self.min_interval_since_deployment
    }

    pub fn deal_date_granularity(&self) -> i64 {
        self.deal_date_granularity
    }

    /// The earliest expiration the validator can accept.
    pub fn min_allowed_expiration(&self) -> Timestamp {
        self.deployment_timestamp
            .saturating_add(self.min_interval_since_deployment)
    }

    /// Returns whether `candidate` is at or above the deployment floor.
    pub fn is_above_floor(&self, candidate: Timestamp) -> bool {
        candidate >= self.min_allowed_expiration()
    }

    /// Fail with [`DateKeeperError::BelowMinimumInterval`] if `candidate` is under the floor.
    pub fn ensure_above_floor(&self, candidate: Timestamp) -> Result<()> {
        if self.is_above_floor(candidate) {
            Ok(())
        } else {
            Err(DateKeeperError::BelowMinimumInterval {
                candidate,
                floor: self.min_allowed_expiration(),
            })
        }
    }

    /// Replace the minimum interval since deployment. Governor only.
    pub fn set_min_interval_since_deployment(
        &mut self,
        ctx: &CallContext,
        value: i64,
    ) -> Result<ValidatorEvent> {
        if let Err(e) = ctx.require(Role::Governor) {
            warn!(caller = %ctx.caller, "rejected min interval change from non-governor");
            return Err(e);
        }
        if value < 0 {
            return Err(DateKeeperError::invalid_parameter(
                "min_interval_since_deployment",
                "must not be negative",
            ));
        }
        let previous = self.min_interval_since_deployment;
        self.min_interval_since_deployment = value;
        info!(
            caller = %ctx.caller,
            previous,
            current = value,
            "min interval since deployment changed"
        );
        Ok(ValidatorEvent::MinIntervalSinceDeploymentChanged {
            previous,
            current: value,
        })
    }
}

/// Record of a committed validator mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorEvent {
    MinIntervalSinceDeploymentChanged {
        previous: i64,
        current: i64,
    },
    FixedDatesReplaced {
        removed: Vec<Timestamp>,
        added: Vec<Timestamp>,
    },
}
